use crate::transform::{cleanse::ForbiddenDomain, markup::html_to_bbcode};
use model::{core::value::Value, entity::schema::EntitySchema, records::row::RowData};
use std::sync::Arc;

/// A per-field rewrite applied to rows that are going to be written.
pub trait Transform: Send + Sync {
    fn apply(&self, schema: &EntitySchema, row: &mut RowData);
}

#[derive(Clone, Default)]
pub struct TransformPipeline {
    transforms: Vec<Arc<dyn Transform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    pub fn apply(&self, schema: &EntitySchema, row: &mut RowData) {
        for transform in &self.transforms {
            transform.apply(schema, row);
        }
    }

    pub fn add_transform<T: Transform + 'static>(mut self, transform: T) -> Self {
        self.transforms.push(Arc::new(transform));
        self
    }
}

/// Strips forbidden-domain URLs from the schema's cleansed fields.
pub struct DomainCleanser {
    domain: ForbiddenDomain,
}

impl Transform for DomainCleanser {
    fn apply(&self, schema: &EntitySchema, row: &mut RowData) {
        for field in schema.cleanse {
            if let Some(cleansed) = self.domain.cleanse_value(&row.get_value(field)) {
                row.set(field, cleansed);
            }
        }
    }
}

/// Converts the schema's markup fields from HTML to BBCode.
pub struct MarkupConverter;

impl Transform for MarkupConverter {
    fn apply(&self, schema: &EntitySchema, row: &mut RowData) {
        for field in schema.markup {
            if let Value::String(html) = row.get_value(field) {
                row.set(field, Value::String(html_to_bbcode(&html)));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    Keep(RowData),
    /// The named exclusion field mentions the forbidden domain.
    Contaminated(&'static str),
}

/// Decides whether a source row may be written and rewrites the ones that may.
#[derive(Clone)]
pub struct RowTransformer {
    domain: ForbiddenDomain,
    pipeline: TransformPipeline,
}

impl RowTransformer {
    pub fn new(domain: ForbiddenDomain) -> Self {
        let pipeline = TransformPipeline::new()
            .add_transform(DomainCleanser {
                domain: domain.clone(),
            })
            .add_transform(MarkupConverter);
        RowTransformer { domain, pipeline }
    }

    pub fn forbidden_domain(&self) -> &ForbiddenDomain {
        &self.domain
    }

    /// First exclusion field whose raw value mentions the forbidden domain.
    pub fn contamination(&self, schema: &EntitySchema, row: &RowData) -> Option<&'static str> {
        schema
            .exclude_if_contains
            .iter()
            .copied()
            .find(|field| self.domain.value_contains(&row.get_value(field)))
    }

    pub fn apply(&self, schema: &EntitySchema, mut row: RowData) -> Transformed {
        if let Some(field) = self.contamination(schema, &row) {
            return Transformed::Contaminated(field);
        }
        self.pipeline.apply(schema, &mut row);
        Transformed::Keep(row)
    }
}
