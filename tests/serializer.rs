use json_autosync::{
    registry, AutoSyncBuilder, Error, Node, PrettyJson, Registry, SerializeOptions, Serializer,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn sample() -> Node {
    let tree = Node::new();
    tree.at(["this", "is", "a"]).unwrap().set("test", "success").unwrap();
    tree.at(["completely", "different", "tree", "and", "different"])
        .unwrap()
        .set("depth", "hello")
        .unwrap();
    tree.at(["this", "is", "not", "a"]).unwrap().set("test", "more success").unwrap();
    tree.at(["this", "is", "a", "different"]).unwrap().set("test", "still good").unwrap();
    tree
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// Writes `key=value` lines for flat string maps.
struct KeyValue;

impl Serializer for KeyValue {
    fn extension(&self) -> &str {
        "kv"
    }

    fn serialize(
        &self,
        data: &Map<String, Value>,
        _options: &SerializeOptions,
    ) -> json_autosync::Result<String> {
        let lines: Vec<String> = data
            .iter()
            .map(|(k, v)| format!("{k}={}", v.as_str().unwrap_or_default()))
            .collect();
        Ok(lines.join("\n"))
    }

    fn deserialize(&self, text: &str) -> json_autosync::Result<Map<String, Value>> {
        text.lines()
            .map(|line| -> json_autosync::Result<(String, Value)> {
                let (k, v) = line
                    .split_once('=')
                    .ok_or_else(|| Error::Deserialize(format!("bad line: {line}")))?;
                Ok((k.to_string(), Value::String(v.to_string())))
            })
            .collect()
    }
}

/// Claims no extension at all.
struct Nameless;

impl Serializer for Nameless {
    fn extension(&self) -> &str {
        ""
    }

    fn serialize(
        &self,
        _data: &Map<String, Value>,
        _options: &SerializeOptions,
    ) -> json_autosync::Result<String> {
        Ok(String::new())
    }

    fn deserialize(&self, _text: &str) -> json_autosync::Result<Map<String, Value>> {
        Ok(Map::new())
    }
}

// ---- pretty json ------------------------------------------------------------

#[test]
fn pretty_sorts_keys_with_two_space_indent() {
    let expected = r#"{
  "completely": {
    "different": {
      "tree": {
        "and": {
          "different": {
            "depth": "hello"
          }
        }
      }
    }
  },
  "this": {
    "is": {
      "a": {
        "different": {
          "test": "still good"
        },
        "test": "success"
      },
      "not": {
        "a": {
          "test": "more success"
        }
      }
    }
  }
}"#;
    assert_eq!(sample().serialize().unwrap(), expected);
}

#[test]
fn pretty_honours_indent_width() {
    let data = as_map(sample().to_value());
    let text = PrettyJson
        .serialize(&data, &SerializeOptions { indent: Some(4) })
        .unwrap();
    assert!(text.starts_with("{\n    \"completely\": {\n        \"different\""));
}

#[test]
fn compact_output_is_one_line() {
    let tree = Node::new();
    tree.at(["1", "2", "3", "4"]).unwrap().set("5", "6").unwrap();
    let text = PrettyJson
        .serialize(&as_map(tree.to_value()), &SerializeOptions { indent: None })
        .unwrap();
    assert_eq!(text, r#"{"1":{"2":{"3":{"4":{"5":"6"}}}}}"#);
}

#[test]
fn sorts_objects_nested_in_arrays() {
    let data = as_map(json!({"z": [{"b": 1, "a": 2}], "a": null}));
    let text = PrettyJson
        .serialize(&data, &SerializeOptions { indent: None })
        .unwrap();
    assert_eq!(text, r#"{"a":null,"z":[{"a":2,"b":1}]}"#);
}

#[test]
fn deserializes_json_objects() {
    let map = PrettyJson.deserialize(r#"{"1": {"2": {"3": {"4": {"5": "6"}}}}}"#).unwrap();
    assert_eq!(Value::Object(map), json!({"1": {"2": {"3": {"4": {"5": "6"}}}}}));
}

#[test]
fn rejects_non_objects_and_bad_syntax() {
    assert!(matches!(PrettyJson.deserialize("42"), Err(Error::Deserialize(_))));
    assert!(matches!(PrettyJson.deserialize("{nope"), Err(Error::Deserialize(_))));
}

#[test]
fn round_trip_is_byte_identical() {
    let options = SerializeOptions::default();
    let samples = [
        json!({}),
        json!({"s": "text", "n": 3, "f": 1.5, "neg": -7, "t": true, "f2": false, "z": null}),
        json!({"deep": {"er": {"est": {"list": [1, "two", null, {"k": "v"}]}}}, "empty": {}}),
        json!({"unicode": "héllo ✓", "quote": "a \"b\" c", "esc": "line\nbreak"}),
    ];
    for value in samples {
        let data = as_map(value);
        let first = PrettyJson.serialize(&data, &options).unwrap();
        let back = PrettyJson.deserialize(&first).unwrap();
        assert_eq!(back, data);
        assert_eq!(PrettyJson.serialize(&back, &options).unwrap(), first);
    }
}

// ---- registry ---------------------------------------------------------------

#[test]
fn unknown_extensions_fall_back_to_json() {
    let reg = Registry::new();
    assert_eq!(reg.lookup(Some("json")).extension(), "json");
    assert_eq!(reg.lookup(Some("yaml")).extension(), "json");
    assert_eq!(reg.lookup(None).extension(), "json");
}

#[test]
fn custom_serializer_claims_its_extension() {
    let mut reg = Registry::new();
    reg.register(Arc::new(KeyValue)).unwrap();
    assert!(reg.contains("kv"));
    assert!(reg.contains(".KV"));
    assert_eq!(reg.lookup(Some("KV")).extension(), "kv");
    assert_eq!(reg.lookup(Some("json")).extension(), "json");
}

#[test]
fn serializer_without_extension_is_rejected() {
    let mut reg = Registry::new();
    assert!(matches!(reg.register(Arc::new(Nameless)), Err(Error::Config(_))));
    assert!(matches!(registry::register(Arc::new(Nameless)), Err(Error::Config(_))));
}

#[test]
fn connect_picks_serializer_by_extension() {
    let dir = TempDir::new().expect("tempdir");
    let mut reg = Registry::new();
    reg.register(Arc::new(KeyValue)).unwrap();
    let reg = Arc::new(reg);

    let path = dir.path().join("settings.kv");
    let config = AutoSyncBuilder::new(&path)
        .registry(Arc::clone(&reg))
        .build()
        .unwrap();
    config.set("b", "2").unwrap();
    config.set("a", "1").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "a=1\nb=2");

    let reloaded = AutoSyncBuilder::new(&path).registry(reg).build().unwrap();
    assert_eq!(reloaded, json!({"a": "1", "b": "2"}));
}

#[test]
fn file_type_overrides_the_extension() {
    let dir = TempDir::new().expect("tempdir");
    let mut reg = Registry::new();
    reg.register(Arc::new(KeyValue)).unwrap();
    let reg = Arc::new(reg);

    let as_kv = dir.path().join("settings.conf");
    let config = AutoSyncBuilder::new(&as_kv)
        .registry(Arc::clone(&reg))
        .file_type("kv")
        .build()
        .unwrap();
    config.set("mode", "fast").unwrap();
    assert_eq!(std::fs::read_to_string(&as_kv).unwrap(), "mode=fast");

    let as_json = dir.path().join("settings.kv");
    let config = AutoSyncBuilder::new(&as_json)
        .registry(reg)
        .file_type("json")
        .build()
        .unwrap();
    config.set("mode", "fast").unwrap();
    assert_eq!(
        std::fs::read_to_string(&as_json).unwrap(),
        "{\n  \"mode\": \"fast\"\n}"
    );
}

#[test]
fn global_registry_is_used_by_connect() {
    /// Same as `KeyValue` under its own tag so other tests are unaffected.
    struct Tagged;

    impl Serializer for Tagged {
        fn extension(&self) -> &str {
            "tagged"
        }

        fn serialize(
            &self,
            data: &Map<String, Value>,
            options: &SerializeOptions,
        ) -> json_autosync::Result<String> {
            KeyValue.serialize(data, options)
        }

        fn deserialize(&self, text: &str) -> json_autosync::Result<Map<String, Value>> {
            KeyValue.deserialize(text)
        }
    }

    registry::register(Arc::new(Tagged)).unwrap();
    assert_eq!(registry::lookup(Some("tagged")).extension(), "tagged");

    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("app.tagged");
    let config = json_autosync::connect(&path).unwrap();
    config.set("k", "v").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "k=v");
}

#[test]
fn dotfiles_use_the_default() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(".configrc");
    let config = json_autosync::connect(&path).unwrap();
    config.set("k", "v").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\n  \"k\": \"v\"\n}");
}

#[test]
fn connect_uses_configured_indent() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("wide.json");
    let config = AutoSyncBuilder::new(&path).indent(Some(4)).build().unwrap();
    config.child("a").unwrap().set("b", 1).unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "{\n    \"a\": {\n        \"b\": 1\n    }\n}"
    );
    assert_eq!(config.serialize().unwrap(), std::fs::read_to_string(&path).unwrap());
}
