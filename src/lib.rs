//! GlossCore: Glossary term annotation engine
//!
//! A Rust/WASM implementation of the glossary annotator: finds the first
//! occurrence of each glossary term in a page's prose, wraps it in a marker
//! and attaches a definition popover, without blocking the page on large
//! documents.
//!
//! # Architecture
//!
//! ## Document
//! - `dom/tree.rs` - ContentTree: arena document with typed marker nodes
//! - `dom/html.rs` - (X)HTML loading and serialisation
//! - `dom/select.rs` - Target / exclude region selection
//!
//! ## Glossary
//! - `glossary/term.rs` - TermTable: filtered, longest-label-first catalog
//! - `glossary/normalize.rs` - Case and accent folding, truncation
//! - `glossary/blacklist.rs` - Labels never to annotate
//!
//! ## Pipeline
//! - `scanner/text.rs` - TextScanner: prose segments and workload sizing
//! - `scanner/matcher.rs` - MatchEngine: first-occurrence tagging
//! - `scheduler/` - ChunkedScheduler: sync or time-sliced passes
//! - `scanner/cleanup.rs` - StructuralCleanup: unnesting and stripping
//! - `presenter/` - AnnotationPresenter: focus wrapping and popovers
//! - `annotator.rs` - Annotator: runs the whole pass
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { GlossaryEngine } from 'glosscore';
//!
//! await init();
//!
//! const engine = new GlossaryEngine(catalog, { exclude: 'nav|.footer' });
//! const { html, report, popovers } = engine.annotateHtml(main.innerHTML);
//!
//! main.innerHTML = html;
//! popovers.forEach(p => tippy(document.getElementById(p.anchorId), {
//!   content: p.content, ...p.options,
//! }));
//! ```

pub mod config;
pub mod error;
pub mod logging;

// Document model
pub mod dom;

// Glossary data
pub mod glossary;

// Pipeline
pub mod scanner;
pub mod scheduler;
pub mod presenter;
pub mod annotator;

// JS surface
pub mod wasm;

pub use annotator::*;
pub use config::*;
pub use dom::*;
pub use error::*;
pub use glossary::*;
pub use logging::*;
pub use presenter::*;
pub use scanner::*;
pub use scheduler::*;
pub use wasm::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Install the panic hook and the console logger
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    init_logging(if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("glosscore v{}", env!("CARGO_PKG_VERSION"))
}
