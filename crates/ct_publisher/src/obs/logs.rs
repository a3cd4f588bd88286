// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! JSON-lines logger writing to stderr.

use serde::Serialize;
use std::{collections::BTreeMap, io::Write, sync::Once};

pub struct Logger;

#[derive(Serialize)]
struct LogEntry<'a> {
    time: String,
    level: String,
    target: &'a str,
    message: String,
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
}

pub static LOGGER: Logger = Logger;

/// Initialize the logger. Later calls are ignored.
pub fn init(level: Option<&str>) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let level = level
            .and_then(|l| l.parse().ok())
            .unwrap_or(log::Level::Info);
        match log::set_logger(&LOGGER) {
            Ok(()) => log::set_max_level(level.to_level_filter()),
            Err(e) => eprintln!("failed to install logger: {e}"),
        }
    });
}

fn format_record(record: &log::Record) -> String {
    struct Visitor<'m>(&'m mut BTreeMap<String, String>);
    impl<'kvs> log::kv::VisitSource<'kvs> for Visitor<'_> {
        fn visit_pair(
            &mut self,
            key: log::kv::Key<'kvs>,
            value: log::kv::Value<'kvs>,
        ) -> Result<(), log::kv::Error> {
            self.0.insert(key.as_str().to_owned(), value.to_string());
            Ok(())
        }
    }

    let mut fields = BTreeMap::new();
    if let (Some(module), Some(file), Some(line)) =
        (record.module_path(), record.file(), record.line())
    {
        fields.insert("location".to_owned(), format!("{module}::{file}:{line}"));
    }
    if let Err(e) = record.key_values().visit(&mut Visitor(&mut fields)) {
        fields.insert("kv_error".to_owned(), e.to_string());
    }
    let entry = LogEntry {
        time: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        level: record.level().to_string(),
        target: record.target(),
        message: record.args().to_string(),
        fields,
    };
    serde_json::to_string(&entry).unwrap_or_else(|e| format!("{{\"message\":\"unloggable record: {e}\"}}"))
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_record(record);
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
