use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AbortSignal, DomParser, File, FormData, Request, RequestInit, Response, SupportedType,
    XmlSerializer,
};

use crate::artifact_url::{self, ConversionArtifacts};
use crate::model::ConversionParams;

pub(crate) const ENGINE_URL: &str = "https://vectoria-motor.onrender.com/vectorize";
const ENGINE_QUERY_KEY: &str = "engine";

const OUTLINE_STYLE: &str = "fill: none !important; stroke: #00FFFF !important; \
     stroke-width: 1px !important; vector-effect: non-scaling-stroke !important;";
const OUTLINE_SHAPES: &[&str] = &[
    "path", "polygon", "polyline", "rect", "circle", "ellipse", "line", "g",
];

pub(crate) fn js_err(error: JsValue) -> String {
    if let Some(value) = error.as_string() {
        return value;
    }
    if let Ok(json) = js_sys::JSON::stringify(&error) {
        if let Some(value) = json.as_string() {
            return value;
        }
    }
    "js error".to_string()
}

/// Optional endpoint override carried in the page query string, e.g.
/// `?engine=http://localhost:9000/vectorize` while developing against a
/// local engine.
pub(crate) fn endpoint_from_query(query: &str) -> Option<String> {
    let params = web_sys::UrlSearchParams::new_with_str(query).ok()?;
    params
        .get(ENGINE_QUERY_KEY)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn engine_endpoint() -> String {
    web_sys::window()
        .and_then(|window| window.location().search().ok())
        .and_then(|search| endpoint_from_query(&search))
        .unwrap_or_else(|| ENGINE_URL.to_string())
}

/// Sends one image plus the conversion parameters as multipart form data and
/// returns the vector document text. Any non-OK status or network error
/// collapses into one engine error.
pub(crate) async fn vectorize(
    file: &File,
    params: &ConversionParams,
    signal: Option<&AbortSignal>,
) -> Result<String, String> {
    let form = FormData::new().map_err(js_err)?;
    form.append_with_blob("image", file).map_err(js_err)?;
    for (name, value) in params.form_fields() {
        form.append_with_str(name, &value).map_err(js_err)?;
    }

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_body(form.as_ref());
    init.set_signal(signal);
    let request = Request::new_with_str_and_init(&engine_endpoint(), &init).map_err(js_err)?;

    let window = web_sys::window().ok_or_else(|| "missing window".to_string())?;
    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(js_err)?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| "unexpected fetch result".to_string())?;
    if !response.ok() {
        return Err(format!("engine responded with status {}", response.status()));
    }
    let text = JsFuture::from(response.text().map_err(js_err)?)
        .await
        .map_err(js_err)?;
    text.as_string()
        .ok_or_else(|| "engine response was not text".to_string())
}

/// Builds the high-contrast outline variant by parsing the vector document
/// and forcing every drawable element to a transparent fill and a uniform
/// cyan stroke. Returns None when the document does not parse.
pub(crate) fn outline_document(svg_text: &str) -> Option<String> {
    let parser = DomParser::new().ok()?;
    let document = parser
        .parse_from_string(svg_text, SupportedType::ImageSvgXml)
        .ok()?;
    if document.get_elements_by_tag_name("parsererror").length() > 0 {
        return None;
    }
    for tag in OUTLINE_SHAPES {
        let shapes = document.get_elements_by_tag_name(tag);
        for index in 0..shapes.length() {
            if let Some(element) = shapes.item(index) {
                let _ = element.set_attribute("style", OUTLINE_STYLE);
            }
        }
    }
    let root = document.document_element()?;
    XmlSerializer::new().ok()?.serialize_to_string(&root).ok()
}

/// Derives both displayable artifacts from one response body, so the result
/// and its outline can never come from different conversions.
pub(crate) fn build_artifacts(svg_text: &str) -> Result<ConversionArtifacts, String> {
    let outline_text =
        outline_document(svg_text).ok_or_else(|| "engine returned an unusable document".to_string())?;
    let result = artifact_url::create_svg_url(svg_text).map_err(js_err)?;
    let outline = match artifact_url::create_svg_url(&outline_text) {
        Ok(url) => url,
        Err(error) => {
            artifact_url::revoke_object_url(&result);
            return Err(js_err(error));
        }
    };
    Ok(ConversionArtifacts { result, outline })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    const SAMPLE_SVG: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 10 10\">\
         <g fill=\"#102030\"><path d=\"M0 0 L10 10\" fill=\"red\"/>\
         <circle cx=\"5\" cy=\"5\" r=\"2\"/></g><rect x=\"1\" y=\"1\" width=\"3\" height=\"3\"/></svg>";

    #[wasm_bindgen_test]
    fn outline_recolors_every_drawable_element() {
        let outline = outline_document(SAMPLE_SVG).expect("outline built");
        assert_ne!(outline, SAMPLE_SVG);
        assert_eq!(outline.matches("stroke: #00FFFF !important").count(), 4);
        assert!(outline.contains("fill: none !important"));
        assert!(outline.contains("viewBox=\"0 0 10 10\""));
    }

    #[wasm_bindgen_test]
    fn outline_rejects_unparseable_documents() {
        assert!(outline_document("this is not a vector document <<<").is_none());
        assert!(outline_document("<svg><path></svg>").is_none());
    }

    #[wasm_bindgen_test]
    fn artifacts_derive_from_one_body() {
        let artifacts = build_artifacts(SAMPLE_SVG).expect("artifacts built");
        assert!(artifacts.result.starts_with("blob:"));
        assert!(artifacts.outline.starts_with("blob:"));
        assert_ne!(artifacts.result, artifacts.outline);
        artifacts.release();
    }

    #[wasm_bindgen_test]
    fn unusable_body_yields_no_artifacts() {
        assert!(build_artifacts("garbage <<<").is_err());
    }

    #[wasm_bindgen_test]
    fn endpoint_override_comes_from_query() {
        assert_eq!(
            endpoint_from_query("?engine=http://localhost:9000/vectorize"),
            Some("http://localhost:9000/vectorize".to_string())
        );
        assert_eq!(endpoint_from_query("?engine=%20%20"), None);
        assert_eq!(endpoint_from_query("?other=1"), None);
        assert_eq!(endpoint_from_query(""), None);
        assert_eq!(engine_endpoint(), ENGINE_URL);
    }
}
