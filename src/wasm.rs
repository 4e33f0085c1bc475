//! WASM surface: GlossaryEngine and GlossaryJob
//!
//! The browser hands over markup and gets annotated markup back, plus a
//! description of each popover for its own tooltip library to attach.
//! `beginHtml` returns a job that JS drives one slice per animation frame:
//!
//! ```js
//! const job = engine.beginHtml(container.innerHTML);
//! const tick = () => job.step() ? render(job.html(), job.popovers()) : requestAnimationFrame(tick);
//! requestAnimationFrame(tick);
//! ```

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::annotator::{AnnotationJob, AnnotationReport, Annotator};
use crate::config::GlossaryConfig;
use crate::dom::ContentTree;
use crate::error::{GlossError, Result};
use crate::glossary::{RawTerm, TermTable};
use crate::presenter::{Describer, PopoverDescriptor};
use crate::scheduler::StepOutcome;

/// Output of a completed pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedPage {
    pub html: String,
    pub report: AnnotationReport,
    pub popovers: Vec<PopoverDescriptor>,
}

fn to_js(e: GlossError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// =============================================================================
// GlossaryEngine
// =============================================================================

/// Glossary loaded once per page
#[wasm_bindgen]
pub struct GlossaryEngine {
    table: TermTable,
    config: GlossaryConfig,
}

impl GlossaryEngine {
    pub fn new(table: TermTable, config: GlossaryConfig) -> Self {
        Self { table, config }
    }

    pub fn from_json(catalog: &str, config: Option<&str>) -> Result<Self> {
        let table = TermTable::from_json(catalog)?;
        let config = match config {
            Some(json) => GlossaryConfig::from_json(json)?,
            None => GlossaryConfig::default(),
        };
        Ok(Self::new(table, config))
    }

    pub fn table(&self) -> &TermTable {
        &self.table
    }

    /// Annotate `html` in one call
    pub fn annotate_html(&self, html: &str) -> Result<AnnotatedPage> {
        let mut job = self.begin_html(html)?;
        while !job.step()? {}
        job.page()
    }

    /// Parse `html` and start a pass over it
    pub fn begin_html(&self, html: &str) -> Result<GlossaryJob> {
        let tree = ContentTree::parse_html(html)?;
        let mut annotator = Annotator::new(self.table.clone(), self.config.clone(), Describer);
        let job = annotator.begin(&tree)?;
        Ok(GlossaryJob { tree, annotator, job })
    }
}

#[wasm_bindgen]
impl GlossaryEngine {
    /// `new GlossaryEngine(catalog, config?)`; `catalog` is an array of
    /// records or its JSON text
    #[wasm_bindgen(constructor)]
    pub fn js_new(catalog: JsValue, config: JsValue) -> std::result::Result<GlossaryEngine, JsValue> {
        let table = if let Some(json) = catalog.as_string() {
            TermTable::from_json(&json).map_err(to_js)?
        } else if js_sys::Array::is_array(&catalog) {
            let raw: Vec<RawTerm> = serde_wasm_bindgen::from_value(catalog)
                .map_err(|e| JsValue::from_str(&format!("Failed to parse catalog: {}", e)))?;
            TermTable::build(raw)
        } else {
            return Err(JsValue::from_str("catalog must be an array or a JSON string"));
        };
        let config: GlossaryConfig = if config.is_undefined() || config.is_null() {
            GlossaryConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Failed to parse config: {}", e)))?
        };
        Ok(Self::new(table, config))
    }

    #[wasm_bindgen(js_name = "fromJson")]
    pub fn js_from_json(catalog: &str, config: Option<String>) -> std::result::Result<GlossaryEngine, JsValue> {
        Self::from_json(catalog, config.as_deref()).map_err(to_js)
    }

    /// Returns `{ html, report, popovers }`
    #[wasm_bindgen(js_name = "annotateHtml")]
    pub fn js_annotate_html(&self, html: &str) -> std::result::Result<JsValue, JsValue> {
        let page = self.annotate_html(html).map_err(to_js)?;
        serde_wasm_bindgen::to_value(&page).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = "beginHtml")]
    pub fn js_begin_html(&self, html: &str) -> std::result::Result<GlossaryJob, JsValue> {
        self.begin_html(html).map_err(to_js)
    }

    #[wasm_bindgen(js_name = "termCount")]
    pub fn term_count(&self) -> usize {
        self.table.len()
    }
}

// =============================================================================
// GlossaryJob
// =============================================================================

/// A pass over one piece of markup, driven from JS
#[wasm_bindgen]
pub struct GlossaryJob {
    tree: ContentTree,
    annotator: Annotator<Describer>,
    job: AnnotationJob,
}

impl GlossaryJob {
    /// One slice. True when the pass is done.
    pub fn step(&mut self) -> Result<bool> {
        let outcome = self.annotator.step(&mut self.job, &mut self.tree)?;
        Ok(outcome == StepOutcome::Done)
    }

    pub fn is_done(&self) -> bool {
        self.job.is_done()
    }

    pub fn html(&self) -> String {
        self.tree.to_html(self.tree.root())
    }

    pub fn report(&self) -> Option<&AnnotationReport> {
        self.job.report()
    }

    /// Popovers still registered (stripped ones are gone)
    pub fn popovers(&self) -> Vec<PopoverDescriptor> {
        self.annotator
            .presenter()
            .registry()
            .iter()
            .map(|(_, handle)| handle.descriptor.clone())
            .collect()
    }

    pub fn handle_key(&mut self, key: &str) -> usize {
        self.annotator.handle_key(key)
    }

    /// Snapshot of the finished page
    pub fn page(&self) -> Result<AnnotatedPage> {
        let report = self
            .report()
            .cloned()
            .ok_or_else(|| GlossError::PassPending("still running".to_string()))?;
        Ok(AnnotatedPage {
            html: self.html(),
            report,
            popovers: self.popovers(),
        })
    }
}

#[wasm_bindgen]
impl GlossaryJob {
    #[wasm_bindgen(js_name = "step")]
    pub fn js_step(&mut self) -> std::result::Result<bool, JsValue> {
        self.step().map_err(to_js)
    }

    #[wasm_bindgen(js_name = "isDone")]
    pub fn js_is_done(&self) -> bool {
        self.is_done()
    }

    #[wasm_bindgen(js_name = "html")]
    pub fn js_html(&self) -> String {
        self.html()
    }

    /// `null` until the pass is done
    #[wasm_bindgen(js_name = "report")]
    pub fn js_report(&self) -> std::result::Result<JsValue, JsValue> {
        match self.report() {
            Some(report) => serde_wasm_bindgen::to_value(report).map_err(|e| JsValue::from_str(&e.to_string())),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = "popovers")]
    pub fn js_popovers(&self) -> std::result::Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.popovers()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Forward a keyup; returns how many popovers were hidden
    #[wasm_bindgen(js_name = "handleKey")]
    pub fn js_handle_key(&mut self, key: &str) -> usize {
        self.handle_key(key)
    }
}

// =============================================================================
// Tests
// =============================================================================
