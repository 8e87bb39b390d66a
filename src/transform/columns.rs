// src/transform/columns.rs

use crate::dataset::{Column, ColumnRef, ColumnSpec, Dataset};
use crate::error::EtlError;

use super::coerce::coerce_column;

/// Keep exactly `refs`, in the given order.
pub fn select(ds: Dataset, refs: &[ColumnRef]) -> Result<Dataset, EtlError> {
    let positions = refs
        .iter()
        .map(|r| ds.resolve(r))
        .collect::<Result<Vec<_>, _>>()?;

    let mut slots: Vec<Option<Column>> = ds.into_columns().into_iter().map(Some).collect();
    let mut picked = Vec::with_capacity(positions.len());
    for (pos, r) in positions.into_iter().zip(refs) {
        let col = slots[pos]
            .take()
            .ok_or_else(|| EtlError::schema(format!("column {} selected twice", r)))?;
        picked.push(col);
    }
    Dataset::new(picked)
}

/// Rename the columns referenced by `specs`; the others keep their names.
/// All sources are resolved against the input before any renaming.
pub fn rename(ds: Dataset, specs: &[ColumnSpec]) -> Result<Dataset, EtlError> {
    let targets = specs
        .iter()
        .map(|s| Ok((ds.resolve(&s.source)?, s.name.clone())))
        .collect::<Result<Vec<_>, EtlError>>()?;

    let mut columns = ds.into_columns();
    for (pos, name) in targets {
        if let Some(name) = name {
            columns[pos].name = name;
        }
    }
    // duplicate names are rejected here
    Dataset::new(columns)
}

/// Declarative column rules: select the sources in order, rename them, and
/// coerce those that declare a type.
pub fn apply_specs(ds: Dataset, specs: &[ColumnSpec]) -> Result<Dataset, EtlError> {
    let sources: Vec<ColumnRef> = specs.iter().map(|s| s.source.clone()).collect();
    let selected = select(ds, &sources)?;

    let positional: Vec<ColumnSpec> = specs
        .iter()
        .enumerate()
        .map(|(i, s)| ColumnSpec {
            source: ColumnRef::Index(i),
            name: s.name.clone(),
            ty: s.ty,
        })
        .collect();
    let renamed = rename(selected, &positional)?;

    let columns = renamed
        .into_columns()
        .into_iter()
        .zip(specs)
        .map(|(col, spec)| match spec.ty {
            Some(ty) => coerce_column(col, ty),
            None => col,
        })
        .collect();
    Dataset::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{SemanticType, Value};

    fn stops() -> Dataset {
        Dataset::new(vec![
            Column::texts("stop_id", ["1", "2"]),
            Column::texts("stop_code", ["A", "B"]),
            Column::texts("stop_name", ["Fulda ZOB", "Hünfeld"]),
            Column::texts("zone_id", ["2001", "x"]),
        ])
        .unwrap()
    }

    #[test]
    fn select_reorders_and_drops() -> anyhow::Result<()> {
        let ds = select(stops(), &["zone_id".into(), ColumnRef::Index(0)])?;
        assert_eq!(ds.column_names(), vec!["zone_id", "stop_id"]);
        assert_eq!(ds.num_rows(), 2);
        Ok(())
    }

    #[test]
    fn select_unknown_column_fails() {
        let res = select(stops(), &["stop_lat".into()]);
        assert!(matches!(res, Err(EtlError::SchemaMismatch(_))));
        let res = select(stops(), &[ColumnRef::Index(9)]);
        assert!(matches!(res, Err(EtlError::SchemaMismatch(_))));
    }

    #[test]
    fn select_same_column_twice_fails() {
        let res = select(stops(), &["stop_id".into(), ColumnRef::Index(0)]);
        assert!(matches!(res, Err(EtlError::SchemaMismatch(_))));
    }

    #[test]
    fn rename_is_simultaneous() -> anyhow::Result<()> {
        // swapping two names must not trip the uniqueness check
        let ds = rename(
            stops(),
            &[
                ColumnSpec::new("stop_id", "stop_code", None),
                ColumnSpec::new("stop_code", "stop_id", None),
            ],
        )?;
        assert_eq!(
            ds.column_names(),
            vec!["stop_code", "stop_id", "stop_name", "zone_id"]
        );
        Ok(())
    }

    #[test]
    fn rename_to_existing_name_fails() {
        let res = rename(stops(), &[ColumnSpec::new("stop_code", "stop_name", None)]);
        assert!(matches!(res, Err(EtlError::SchemaMismatch(_))));
    }

    #[test]
    fn rename_then_select_equals_select_then_rename() -> anyhow::Result<()> {
        let specs = [
            ColumnSpec::new("stop_id", "id", None),
            ColumnSpec::new("zone_id", "zone", None),
        ];

        let a = select(rename(stops(), &specs)?, &["zone".into(), "id".into()])?;
        let b = rename(
            select(stops(), &["zone_id".into(), "stop_id".into()])?,
            &specs,
        )?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn specs_select_rename_and_coerce() -> anyhow::Result<()> {
        let ds = apply_specs(
            stops(),
            &[
                ColumnSpec::new(0usize, "id", Some(SemanticType::Integer)),
                ColumnSpec::new("stop_name", "name", None),
                ColumnSpec::new(3usize, "zone", Some(SemanticType::Integer)),
            ],
        )?;
        assert_eq!(ds.column_names(), vec!["id", "name", "zone"]);
        let zone = ds.column("zone").unwrap();
        assert_eq!(zone.ty, SemanticType::Integer);
        assert_eq!(zone.values, vec![Value::Integer(2001), Value::Missing]);
        assert_eq!(ds.column("name").unwrap().ty, SemanticType::Text);
        Ok(())
    }
}
