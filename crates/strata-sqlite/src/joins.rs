//! Join resolution for dotted property paths.

use std::collections::HashMap;

use strata_core::{
    error::{Result, StrataError},
    model::Model,
};

use crate::store::Store;

/// Tracks the outer joins needed to reach nested reference columns.
///
/// Clients provide field names in a `foo.bar.baz` form, where `baz` is the
/// column name and `foo.bar` are references. For that example the builder
/// produces:
///
/// ```text
/// FROM "base" AS t0
/// LEFT OUTER JOIN "foo table" AS t1 ON json_extract(t0.data, '$.foo') = t1.id
/// LEFT OUTER JOIN "bar table" AS t2 ON json_extract(t1.data, '$.bar') = t2.id
/// ```
///
/// Joins are keyed by the tuple of reference segments consumed so far, so
/// paths sharing a prefix reuse the alias instead of joining twice.
pub(crate) struct JoinBuilder<'a> {
    store: &'a Store,
    model: &'a Model,
    aliases: HashMap<Vec<String>, String>,
    joins: Vec<String>,
    next_alias: usize,
}

impl<'a> JoinBuilder<'a> {
    pub(crate) fn new(store: &'a Store, model: &'a Model) -> Self {
        let mut aliases = HashMap::new();
        aliases.insert(Vec::new(), "t0".to_string());
        Self {
            store,
            model,
            aliases,
            joins: Vec::new(),
            next_alias: 1,
        }
    }

    /// SQL column expression for a dotted property path.
    ///
    /// All but the last segment must name reference properties; violations
    /// are configuration errors, not per-row conditions.
    pub(crate) fn resolve(&mut self, path: &str) -> Result<String> {
        let store = self.store;
        let mut segments: Vec<&str> = path.split('.').collect();
        let name = segments.pop().unwrap_or_default();
        if name.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(StrataError::Config(format!(
                "malformed property path '{path}'"
            )));
        }

        let mut model = self.model;
        for at in 0..segments.len() {
            let ref_name = segments[at];
            let property = model.property(ref_name).ok_or_else(|| {
                StrataError::Config(format!(
                    "unknown property '{ref_name}' on model '{}' in path '{path}'",
                    model.name(),
                ))
            })?;
            let target = property.ref_model().ok_or_else(|| {
                StrataError::Config(format!(
                    "property '{ref_name}' on model '{}' is not a reference in path '{path}'",
                    model.name(),
                ))
            })?;
            let (next_model, tables) = store.lookup(model.namespace(), target)?;

            let prefix: Vec<String> = segments[..=at].iter().map(|s| s.to_string()).collect();
            if !self.aliases.contains_key(&prefix) {
                let left = self.aliases[&segments[..at]
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()]
                    .clone();
                let alias = format!("t{}", self.next_alias);
                self.next_alias += 1;
                self.joins.push(format!(
                    "LEFT OUTER JOIN {} AS {alias} ON json_extract({left}.data, '$.{ref_name}') = {alias}.id",
                    tables.main_sql(),
                ));
                self.aliases.insert(prefix, alias);
            }
            model = next_model;
        }

        let alias = &self.aliases[&segments.iter().map(|s| s.to_string()).collect::<Vec<_>>()];
        if name == "id" {
            Ok(format!("{alias}.id"))
        } else if valid_column(name) {
            Ok(format!("json_extract({alias}.data, '$.{name}')"))
        } else {
            Err(StrataError::Config(format!(
                "malformed column name '{name}' in path '{path}'"
            )))
        }
    }

    /// FROM clause for the base table plus every join built so far.
    pub(crate) fn from_clause(&self, base_sql: &str) -> String {
        let mut sql = format!("{base_sql} AS t0");
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        sql
    }

    #[cfg(test)]
    fn join_count(&self) -> usize {
        self.joins.len()
    }
}

// Column names land inside json paths; anything beyond identifier
// characters is rejected rather than escaped.
fn valid_column(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{
        model::{ModelDef, Property, ScalarKind},
        traits::DatasetBackend,
    };

    fn store_with_chain() -> (Store, Model) {
        let continent = Model::build(
            ModelDef::new("gov", "continent")
                .property(Property::scalar("title", ScalarKind::String))
                .property(Property::scalar("code", ScalarKind::String)),
        )
        .unwrap();
        let country = Model::build(
            ModelDef::new("gov", "country")
                .property(Property::scalar("title", ScalarKind::String))
                .property(Property::reference("continent", "continent")),
        )
        .unwrap();
        let capital = Model::build(
            ModelDef::new("gov", "capital")
                .property(Property::scalar("title", ScalarKind::String))
                .property(Property::reference("country", "country")),
        )
        .unwrap();

        let mut store = Store::in_memory().unwrap();
        store.register(&continent).unwrap();
        store.register(&country).unwrap();
        store.register(&capital).unwrap();
        store.migrate().unwrap();
        (store, capital)
    }

    #[test]
    fn test_shared_prefix_reuses_joins() {
        let (store, capital) = store_with_chain();
        let mut joins = JoinBuilder::new(&store, &capital);

        let x = joins.resolve("country.continent.title").unwrap();
        let y = joins.resolve("country.continent.code").unwrap();

        // One join for `country`, one for `country.continent` - not four.
        assert_eq!(joins.join_count(), 2);
        assert_eq!(x, "json_extract(t2.data, '$.title')");
        assert_eq!(y, "json_extract(t2.data, '$.code')");
    }

    #[test]
    fn test_prefix_of_longer_path_adds_no_join() {
        let (store, capital) = store_with_chain();
        let mut joins = JoinBuilder::new(&store, &capital);

        joins.resolve("country.continent.title").unwrap();
        let title = joins.resolve("country.title").unwrap();

        assert_eq!(joins.join_count(), 2);
        assert_eq!(title, "json_extract(t1.data, '$.title')");
    }

    #[test]
    fn test_plain_columns_stay_on_base_table() {
        let (store, capital) = store_with_chain();
        let mut joins = JoinBuilder::new(&store, &capital);

        assert_eq!(joins.resolve("id").unwrap(), "t0.id");
        assert_eq!(
            joins.resolve("title").unwrap(),
            "json_extract(t0.data, '$.title')"
        );
        assert_eq!(joins.join_count(), 0);
    }

    #[test]
    fn test_final_id_segment_binds_primary_key() {
        let (store, capital) = store_with_chain();
        let mut joins = JoinBuilder::new(&store, &capital);

        assert_eq!(joins.resolve("country.id").unwrap(), "t1.id");
    }

    #[test]
    fn test_non_reference_segment_is_config_error() {
        let (store, capital) = store_with_chain();
        let mut joins = JoinBuilder::new(&store, &capital);

        let err = joins.resolve("title.code").unwrap_err();
        assert!(matches!(err, StrataError::Config(_)));
    }

    #[test]
    fn test_unknown_property_is_config_error() {
        let (store, capital) = store_with_chain();
        let mut joins = JoinBuilder::new(&store, &capital);

        let err = joins.resolve("region.title").unwrap_err();
        assert!(matches!(err, StrataError::Config(_)));
    }

    #[test]
    fn test_unregistered_reference_target_is_config_error() {
        let country = Model::build(
            ModelDef::new("gov", "country")
                .property(Property::reference("continent", "continent")),
        )
        .unwrap();
        let mut store = Store::in_memory().unwrap();
        store.register(&country).unwrap();
        store.migrate().unwrap();

        let mut joins = JoinBuilder::new(&store, &country);
        let err = joins.resolve("continent.title").unwrap_err();
        assert!(matches!(err, StrataError::Config(_)));
    }
}
