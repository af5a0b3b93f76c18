mod app;
mod form;
mod mutation;
mod support;
