use crate::domain::model::{Record, COPYRIGHTED_URLS, INFRINGING_URLS};
use crate::utils::error::{EtlError, Result};
use serde_json::{Map, Value};
use std::collections::HashSet;

const NOTICES: &str = "notices";
const WORKS: &str = "works";
const URL: &str = "url";

/// 解析原始 JSON，取出 `notices` 陣列
pub fn parse_notices(bytes: &[u8]) -> Result<Vec<Value>> {
    let document: Value = serde_json::from_slice(bytes)
        .map_err(|e| EtlError::input(format!("input is not valid JSON: {}", e)))?;

    match document {
        Value::Object(mut root) => match root.remove(NOTICES) {
            Some(Value::Array(notices)) => Ok(notices),
            Some(other) => Err(EtlError::input(format!(
                "'notices' must be an array, found {}",
                type_name(&other)
            ))),
            None => Err(EtlError::input("missing top-level 'notices' array")),
        },
        other => Err(EtlError::input(format!(
            "expected a JSON object at the top level, found {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Explodes notices into one row per (work, copyrighted url, infringing url).
///
/// An empty or missing list still yields one row, with `null` in that column.
/// Columns that are `null` in every row are dropped, except `infringing_urls`.
pub fn flatten(notices: &[Value]) -> Vec<Record> {
    let mut rows = Vec::new();

    for (index, notice) in notices.iter().enumerate() {
        let Some(notice) = notice.as_object() else {
            tracing::warn!("⚠️ Skipping notice #{}: not a JSON object", index);
            continue;
        };

        let mut base = Map::new();
        for (key, value) in notice {
            if key != WORKS {
                base.insert(key.clone(), value.clone());
            }
        }

        let works = notice.get(WORKS).and_then(Value::as_array);
        match works {
            Some(works) if !works.is_empty() => {
                for work in works {
                    explode_work(&base, work, &mut rows);
                }
            }
            _ => {
                let mut data = base.clone();
                data.insert(COPYRIGHTED_URLS.to_string(), Value::Null);
                data.insert(INFRINGING_URLS.to_string(), Value::Null);
                rows.push(Record { data });
            }
        }
    }

    drop_null_columns(&mut rows);
    tracing::debug!("Flattened {} notices into {} rows", notices.len(), rows.len());
    rows
}

fn explode_work(base: &Map<String, Value>, work: &Value, rows: &mut Vec<Record>) {
    let empty = Map::new();
    let work = work.as_object().unwrap_or(&empty);

    let copyrighted = urls_of(work.get(COPYRIGHTED_URLS));
    let infringing = urls_of(work.get(INFRINGING_URLS));

    let mut template = base.clone();
    for (key, value) in work {
        if key != COPYRIGHTED_URLS && key != INFRINGING_URLS {
            template.insert(key.clone(), value.clone());
        } else {
            // 先佔位，保留欄位順序
            template.insert(key.clone(), Value::Null);
        }
    }

    for copyrighted_url in &copyrighted {
        for infringing_url in &infringing {
            let mut data = template.clone();
            data.insert(COPYRIGHTED_URLS.to_string(), copyrighted_url.clone());
            data.insert(INFRINGING_URLS.to_string(), infringing_url.clone());
            rows.push(Record { data });
        }
    }
}

fn urls_of(list: Option<&Value>) -> Vec<Value> {
    let urls: Vec<Value> = list
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::Object(obj) => obj.get(URL).cloned().unwrap_or(Value::Null),
                    Value::String(s) => Value::String(s.clone()),
                    _ => Value::Null,
                })
                .collect()
        })
        .unwrap_or_default();

    if urls.is_empty() {
        vec![Value::Null]
    } else {
        urls
    }
}

fn drop_null_columns(rows: &mut [Record]) {
    let mut seen = HashSet::new();
    let mut populated = HashSet::new();
    for row in rows.iter() {
        for (key, value) in &row.data {
            seen.insert(key.clone());
            if !value.is_null() {
                populated.insert(key.clone());
            }
        }
    }

    let empty: Vec<String> = seen
        .into_iter()
        .filter(|key| !populated.contains(key) && key != INFRINGING_URLS)
        .collect();
    if empty.is_empty() {
        return;
    }

    tracing::debug!("Dropping all-null columns: {:?}", empty);
    for row in rows.iter_mut() {
        for key in &empty {
            row.data.shift_remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_notices_requires_array() {
        assert_eq!(parse_notices(br#"{"notices": []}"#).unwrap().len(), 0);
        assert!(parse_notices(b"not json").is_err());
        assert!(parse_notices(br#"{"other": []}"#).is_err());
        assert!(parse_notices(br#"{"notices": {}}"#).is_err());
        assert!(parse_notices(br#"[1, 2]"#).is_err());
    }

    #[test]
    fn test_flatten_explodes_url_combinations() {
        let notices = vec![json!({
            "id": 1,
            "principal_name": "Acme Records",
            "date_sent": "2024-01-02T10:00:00Z",
            "works": [{
                "description": "Album",
                "copyrighted_urls": [{"url": "https://acme.test/a"}, {"url": "https://acme.test/b"}],
                "infringing_urls": [{"url": "https://pirate.test/1"}, {"url": "https://pirate.test/2"}, {"url": "bad"}]
            }]
        })];

        let rows = flatten(&notices);

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].get_str("copyrighted_urls"), Some("https://acme.test/a"));
        assert_eq!(rows[0].get_str("infringing_urls"), Some("https://pirate.test/1"));
        assert_eq!(rows[5].get_str("copyrighted_urls"), Some("https://acme.test/b"));
        assert_eq!(rows[5].get_str("infringing_urls"), Some("bad"));
        assert_eq!(rows[3].get_str("principal_name"), Some("Acme Records"));
        assert!(!rows[0].data.contains_key("works"));

        let keys: Vec<&String> = rows[0].data.keys().collect();
        assert_eq!(
            keys,
            vec!["id", "principal_name", "date_sent", "description", "copyrighted_urls", "infringing_urls"]
        );
    }

    #[test]
    fn test_flatten_keeps_row_for_empty_lists() {
        let notices = vec![
            json!({"id": 1, "works": []}),
            json!({"id": 2, "works": [{"copyrighted_urls": [], "infringing_urls": [{"url": "https://x.test/"}]}]}),
        ];

        let rows = flatten(&notices);

        assert_eq!(rows.len(), 2);
        assert!(rows[0].data.get("infringing_urls").unwrap().is_null());
        assert_eq!(rows[1].get_str("infringing_urls"), Some("https://x.test/"));
    }

    #[test]
    fn test_flatten_drops_all_null_columns() {
        let notices = vec![
            json!({"id": 1, "topic": null, "works": [{"infringing_urls": [{"url": "https://x.test/"}]}]}),
            json!({"id": 2, "topic": null, "works": [{"infringing_urls": [{"url": "https://y.test/"}]}]}),
        ];

        let rows = flatten(&notices);

        assert_eq!(rows.len(), 2);
        assert!(!rows[0].data.contains_key("topic"));
        assert!(!rows[0].data.contains_key("copyrighted_urls"));
        assert!(rows[0].data.contains_key("infringing_urls"));
    }

    #[test]
    fn test_flatten_skips_non_object_notices() {
        let notices = vec![json!("oops"), json!({"id": 3, "works": [{"infringing_urls": [{"url": "https://z.test/"}]}]})];
        assert_eq!(flatten(&notices).len(), 1);
    }
}
