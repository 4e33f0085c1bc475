//! Browser smoke tests for the JS surface (`wasm-pack test --headless --firefox`)

#![cfg(target_arch = "wasm32")]

use glosscore::{version, GlossaryEngine};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn engine() -> GlossaryEngine {
    let catalog = js_sys::JSON::parse(r#"[{"Libelle": "Eau", "Id": 1, "Definition": "Liquide."}]"#).unwrap();
    GlossaryEngine::js_new(catalog, JsValue::UNDEFINED).unwrap()
}

#[wasm_bindgen_test]
fn version_is_prefixed() {
    assert!(version().starts_with("glosscore v"));
}

#[wasm_bindgen_test]
fn constructor_accepts_array_and_json_text() {
    assert_eq!(engine().term_count(), 1);

    let from_text = GlossaryEngine::js_new(JsValue::from_str(r#"[{"label": "Nappe"}]"#), JsValue::NULL).unwrap();
    assert_eq!(from_text.term_count(), 1);

    assert!(GlossaryEngine::js_new(JsValue::from_f64(3.0), JsValue::NULL).is_err());
}

#[wasm_bindgen_test]
fn job_steps_to_completion() {
    let mut job = engine().js_begin_html("<body><p>L'eau.</p></body>").unwrap();
    assert!(job.js_report().unwrap().is_null());
    while !job.js_step().unwrap() {}

    assert!(job.js_is_done());
    assert!(job.js_html().contains("_geau_glossary_concept"));
    assert!(!job.js_report().unwrap().is_null());
    assert!(js_sys::Array::is_array(&job.js_popovers().unwrap()));
    assert_eq!(job.js_handle_key("Escape"), 0);
}
