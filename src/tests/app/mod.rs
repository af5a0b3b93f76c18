mod editor_focus_tests;
