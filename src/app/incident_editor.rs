use std::rc::Rc;

use anyhow::{Context, Result};
use futures::executor::LocalPool;
use tracing::info;

use crate::{
    cache::{RecordCache, RecordSource},
    domain::{FieldDefinition, Fields, RecordId},
    events::DismissHub,
    form::{CandidateCreator, DiscardPolicy, FieldController, InlineField},
    mutation::{FieldWriter, MutationCoordinator},
};

use super::{
    options::UiOptions,
    runtime::{App, ArmedConfirm},
};

/// Terminal editor for one record: every field rendered inline with its own
/// optimistic save.
pub struct IncidentEditor {
    record: RecordId,
    fields: Vec<FieldDefinition>,
    source: Rc<dyn RecordSource>,
    writer: Rc<dyn FieldWriter>,
    creator: Option<Rc<dyn CandidateCreator>>,
    title: Option<String>,
    options: UiOptions,
}

impl IncidentEditor {
    pub fn new(
        record: RecordId,
        fields: Vec<FieldDefinition>,
        source: Rc<dyn RecordSource>,
        writer: Rc<dyn FieldWriter>,
    ) -> Self {
        Self {
            record,
            fields,
            source,
            writer,
            creator: None,
            title: None,
            options: UiOptions::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_options(mut self, options: UiOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_creator(mut self, creator: Rc<dyn CandidateCreator>) -> Self {
        self.creator = Some(creator);
        self
    }

    /// Run until the user quits. Returns the record as last seen by the cache.
    pub fn run(self) -> Result<Fields> {
        let IncidentEditor {
            record,
            fields,
            source,
            writer,
            creator,
            title,
            options,
        } = self;

        let cache = RecordCache::new();
        let mut pool = LocalPool::new();
        pool.run_until(cache.refresh(source.as_ref(), &record))
            .with_context(|| format!("failed to load record {record}"))?;
        info!(%record, fields = fields.len(), "record loaded");

        let coordinator = MutationCoordinator::new(cache, writer);
        let hub = DismissHub::new();
        let discard_guard = Rc::new(ArmedConfirm::default());
        let inline_fields = fields
            .into_iter()
            .map(|definition| {
                let mut controller =
                    FieldController::new(record.clone(), definition, coordinator.clone());
                if options.confirm_discard {
                    controller = controller
                        .with_discard_policy(DiscardPolicy::Confirm(discard_guard.clone()));
                }
                let mut field = InlineField::new(controller)
                    .with_policy(options.policy)
                    .with_palette(options.palette())
                    .with_dismiss_hub(hub.clone());
                if options.allow_create
                    && let Some(creator) = &creator
                {
                    field = field.with_creator(Rc::clone(creator));
                }
                field
            })
            .collect();

        let title = title.unwrap_or_else(|| format!("Record {record}"));
        let mut app = App::new(
            title,
            record,
            inline_fields,
            coordinator,
            source,
            hub,
            discard_guard,
            options,
        );
        app.run(&mut pool)
    }
}
