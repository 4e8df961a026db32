//! Sort planning.
//!
//! Sort-key extraction is a single pass producing an abstract [`SortKey`];
//! two renderers turn the keys into either a YAZ sortspec string (Type-1
//! path, and SRU targets below 1.2) or a CQL `sortby` clause.

use zgate_core::config::DatabaseConfig;
use zgate_core::diag::{bib1, Diagnostic};
use zgate_core::rpn::{attr_type, Attribute};

/// One sort key as decoded from the client's sort request.
#[derive(Debug, Clone, Default)]
pub struct SortKeyRequest {
    pub sortfield: Option<String>,
    pub elementspec_type: Option<String>,
    pub elementspec_value: Option<String>,
    pub attrs: Vec<Attribute>,
    /// 0 = ascending, 1 = descending.
    pub relation: u64,
    /// 0 = case-sensitive.
    pub case: u64,
    /// 0 = unspecified, 1 = abort, 2 = omit, 3 = use default value.
    pub missing: u64,
}

/// What the key sorts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortField {
    /// Client-supplied field name, used verbatim.
    Literal(String),
    ElementSpec { spec_type: String, value: String },
    /// BIB-1 Use attribute, mapped per dialect at render time.
    AccessPoint(u64),
}

/// Missing-value action; only expressible on the CQL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingAction {
    Unspecified,
    Fail,
    Omit,
    DefaultValue,
}

/// Dialect-independent sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
    pub case_insensitive: bool,
    pub missing: MissingAction,
}

/// Extract the abstract key from one request entry.
pub fn extract_sort_key(req: &SortKeyRequest) -> Result<SortKey, Diagnostic> {
    let field = if let Some(field) = &req.sortfield {
        SortField::Literal(field.clone())
    } else if let Some(spec_type) = &req.elementspec_type {
        SortField::ElementSpec {
            spec_type: spec_type.clone(),
            value: req.elementspec_value.clone().unwrap_or_default(),
        }
    } else {
        let mut access_point = None;
        for attr in &req.attrs {
            if !attr.is_bib1() {
                let oid = attr.set.as_deref().unwrap_or_default();
                return Err(Diagnostic::new(bib1::UNSUPPORTED_ATTRIBUTE_SET, oid));
            }
            if attr.kind == attr_type::USE {
                access_point = Some(attr.value);
            }
        }
        let ap = access_point
            .ok_or_else(|| Diagnostic::new(bib1::UNSUPPORTED_SORT_ATTRIBUTE, ""))?;
        SortField::AccessPoint(ap)
    };

    Ok(SortKey {
        field,
        descending: req.relation == 1,
        case_insensitive: req.case != 0,
        missing: match req.missing {
            1 => MissingAction::Fail,
            2 => MissingAction::Omit,
            3 => MissingAction::DefaultValue,
            _ => MissingAction::Unspecified,
        },
    })
}

/// Render keys as a YAZ sortspec. The missing-value action has no YAZ
/// counterpart and is dropped.
pub fn yaz_sortspec(keys: &[SortKey]) -> String {
    keys.iter()
        .map(|key| {
            let field = match &key.field {
                SortField::Literal(name) => name.clone(),
                SortField::ElementSpec { spec_type, value } => {
                    format!("{}={}", spec_type, value)
                }
                SortField::AccessPoint(ap) => format!("1={}", ap),
            };
            format!(
                "{} {}{}",
                field,
                if key.descending { ">" } else { "<" },
                if key.case_insensitive { "i" } else { "s" }
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render keys as a CQL `sortby` clause body. Access points go through the
/// database's search map, like query terms do.
pub fn cql_sortby(keys: &[SortKey], db: &DatabaseConfig) -> Result<String, Diagnostic> {
    let mut parts = Vec::with_capacity(keys.len());
    for key in keys {
        let index = match &key.field {
            SortField::Literal(name) => name.clone(),
            SortField::ElementSpec { value, spec_type } => {
                if value.is_empty() {
                    spec_type.clone()
                } else {
                    value.clone()
                }
            }
            SortField::AccessPoint(ap) => db.index_for(*ap).ok_or_else(|| {
                Diagnostic::new(bib1::UNSUPPORTED_USE_ATTRIBUTE, ap.to_string())
            })?,
        };
        let mut part = format!(
            "{}/sort.{}/sort.{}",
            index,
            if key.descending {
                "descending"
            } else {
                "ascending"
            },
            if key.case_insensitive {
                "ignoreCase"
            } else {
                "respectCase"
            }
        );
        match key.missing {
            MissingAction::Fail => part.push_str("/sort.missingFail"),
            MissingAction::Omit => part.push_str("/sort.missingOmit"),
            MissingAction::DefaultValue => part.push_str("/sort.missingValue=UNSPECIFIED"),
            MissingAction::Unspecified => {}
        }
        parts.push(part);
    }
    Ok(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use zgate_core::config::{IndexSpec, SearchConfig};

    #[test]
    fn literal_sortfield_renders_verbatim() {
        let key = extract_sort_key(&SortKeyRequest {
            sortfield: Some("title".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(yaz_sortspec(&[key]), "title <s");
    }

    #[test]
    fn access_point_renders_as_bib1_pair() {
        let key = extract_sort_key(&SortKeyRequest {
            attrs: vec![Attribute::new(1, 4)],
            relation: 1,
            case: 1,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(yaz_sortspec(&[key]), "1=4 >i");
    }

    #[test]
    fn missing_use_attribute_is_237() {
        let err = extract_sort_key(&SortKeyRequest {
            attrs: vec![Attribute::new(2, 3)],
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.code, bib1::UNSUPPORTED_SORT_ATTRIBUTE);
    }

    #[test]
    fn foreign_attribute_set_is_121() {
        let err = extract_sort_key(&SortKeyRequest {
            attrs: vec![Attribute::with_set("1.2.840.10003.3.5", 1, 4)],
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.code, bib1::UNSUPPORTED_ATTRIBUTE_SET);
    }

    #[test]
    fn cql_sortby_maps_access_point_and_appends_modifiers() {
        let mut map = BTreeMap::new();
        map.insert("4".to_string(), IndexSpec { index: "title".to_string() });
        let db = DatabaseConfig {
            search: Some(SearchConfig {
                querytype: None,
                map,
            }),
            ..Default::default()
        };
        let key = extract_sort_key(&SortKeyRequest {
            attrs: vec![Attribute::new(1, 4)],
            relation: 1,
            missing: 2,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            cql_sortby(&[key], &db).unwrap(),
            "title/sort.descending/sort.respectCase/sort.missingOmit"
        );
    }

    #[test]
    fn multiple_keys_join_with_spaces() {
        let keys = vec![
            extract_sort_key(&SortKeyRequest {
                sortfield: Some("title".to_string()),
                ..Default::default()
            })
            .unwrap(),
            extract_sort_key(&SortKeyRequest {
                sortfield: Some("year".to_string()),
                relation: 1,
                ..Default::default()
            })
            .unwrap(),
        ];
        assert_eq!(yaz_sortspec(&keys), "title <s year >s");
    }
}
