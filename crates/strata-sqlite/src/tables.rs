//! Physical table naming for model table pairs.

use strata_core::model::Model;

/// Registry key and main-table name for a model:
/// `{model_name}/:source/{namespace_name}`.
pub fn table_key(model: &Model) -> String {
    format!("{}/:source/{}", model.name(), model.namespace())
}

/// Quote an identifier for direct inclusion in SQL.
///
/// Table names carry `/` and `:` and must always go through here.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// The physical main/changes table pair backing one model.
#[derive(Debug, Clone)]
pub struct TableSet {
    key: String,
    main: String,
    changes: String,
}

impl TableSet {
    pub(crate) fn new(model: &Model) -> Self {
        let key = table_key(model);
        let main = key.clone();
        let changes = format!("{key}/:changes");
        Self { key, main, changes }
    }

    /// Registry key; also the `type` attribute of projected records.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn main_name(&self) -> &str {
        &self.main
    }

    pub fn changes_name(&self) -> &str {
        &self.changes
    }

    /// Quoted main-table name, ready for SQL.
    pub(crate) fn main_sql(&self) -> String {
        quote_ident(&self.main)
    }

    /// Quoted changes-table name, ready for SQL.
    pub(crate) fn changes_sql(&self) -> String {
        quote_ident(&self.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::model::{ModelDef, Property, ScalarKind};

    #[test]
    fn test_table_naming() {
        let model = Model::build(
            ModelDef::new("gov", "country").property(Property::scalar("title", ScalarKind::String)),
        )
        .unwrap();
        let tables = TableSet::new(&model);

        assert_eq!(tables.key(), "country/:source/gov");
        assert_eq!(tables.main_name(), "country/:source/gov");
        assert_eq!(tables.changes_name(), "country/:source/gov/:changes");
        assert_eq!(tables.main_sql(), "\"country/:source/gov\"");
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
