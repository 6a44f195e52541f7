//! CLI smoke entry point.
//!
//! # Responsibility
//! - Build a headless page, run the loader against a loader config file and
//!   drive a probe module through its lifecycle.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `modbox_cli <loader-config.json> [container-id ...]`
//! Set `MODBOX_LOG_DIR` to an absolute path to enable file logging.

use modbox_core::{
    event_table, init_logging, load_modules, DomAdapter, Event, EventHandler, LoaderConfig,
    LoggingConfig, MemoryDocument, Module, ModuleBuildError, ModuleRegistry, Sandbox,
};
use serde_json::json;
use std::process::ExitCode;
use std::rc::Rc;

const READY_CLASS: &str = "ready";

struct ProbeModule {
    sandbox: Sandbox,
}

impl Module for ProbeModule {
    fn init(&mut self) {
        let sandbox = self.sandbox.clone();
        let on_ping: EventHandler = Rc::new(move |_: &serde_json::Value| {
            if let Some(container) = sandbox.parent() {
                sandbox.add_class(container, READY_CLASS);
            }
        });
        if let Err(err) = self.sandbox.listen(event_table([("ping", on_ping)])) {
            log::warn!("event=probe_listen module=cli status=error reason={err}");
        }
    }

    fn destroy(&mut self) {
        if let Err(err) = self.sandbox.ignore() {
            log::warn!("event=probe_ignore module=cli status=error reason={err}");
        }
    }
}

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(config_path) = args.next() else {
        eprintln!("usage: modbox_cli <loader-config.json> [container-id ...]");
        return ExitCode::from(2);
    };
    let containers: Vec<String> = args.collect();

    if let Ok(log_dir) = std::env::var("MODBOX_LOG_DIR") {
        if let Err(err) = init_logging(&LoggingConfig::with_default_level(log_dir)) {
            eprintln!("logging disabled: {err}");
        }
    }

    let config = match LoaderConfig::from_path(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let document = Rc::new(MemoryDocument::new());
    let Some(body) = document.body() else {
        eprintln!("document has no body");
        return ExitCode::FAILURE;
    };
    for id in &containers {
        document.insert_element(body, "div", &[("id", id.as_str())]);
    }

    println!("modbox_core version={}", modbox_core::core_version());
    for src in load_modules(&config, &*document) {
        println!("loaded script={src}");
    }

    let registry = ModuleRegistry::new(document.clone());
    for id in &containers {
        let created = registry.create(id, |sandbox| {
            sandbox
                .require_parent()
                .map_err(|err| ModuleBuildError::new(err.to_string()))?;
            Ok(Box::new(ProbeModule { sandbox }) as Box<dyn Module>)
        });
        if let Err(err) = created {
            eprintln!("{err}");
        }
    }
    if let Err(err) = registry.start_all() {
        eprintln!("{err}");
    }

    match registry.trigger_event(&Event::new("ping", json!({ "source": "cli" }))) {
        Ok(count) => println!("ping handlers={count}"),
        Err(err) => eprintln!("{err}"),
    }
    for id in &containers {
        let ready = document
            .element_by_id(id)
            .and_then(|element| document.attribute(element, "class"))
            .is_some_and(|class| class.split_whitespace().any(|c| c == READY_CLASS));
        println!("module={id} ready={ready}");
    }

    if let Err(err) = registry.stop_all() {
        eprintln!("{err}");
    }
    ExitCode::SUCCESS
}
