use wasm_bindgen::JsValue;
use web_sys::{Blob, BlobPropertyBag, Url};

pub(crate) const SVG_MIME: &str = "image/svg+xml";

pub(crate) fn create_svg_url(text: &str) -> Result<String, JsValue> {
    let parts = js_sys::Array::new();
    parts.push(&JsValue::from_str(text));
    let options = BlobPropertyBag::new();
    options.set_type(SVG_MIME);
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;
    Url::create_object_url_with_blob(&blob)
}

pub(crate) fn create_blob_url(blob: &Blob) -> Result<String, JsValue> {
    Url::create_object_url_with_blob(blob)
}

pub(crate) fn revoke_object_url(url: &str) {
    let _ = Url::revoke_object_url(url);
}

/// The result/outline object URLs derived from one engine response. The two
/// always travel together so a mismatched pair cannot be displayed.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ConversionArtifacts {
    pub(crate) result: String,
    pub(crate) outline: String,
}

impl ConversionArtifacts {
    pub(crate) fn release(&self) {
        revoke_object_url(&self.result);
        revoke_object_url(&self.outline);
    }
}

/// Displayable references held by one session: the original raster plus the
/// current conversion artifacts. Superseded URLs are revoked synchronously
/// so repeated parameter tweaks do not accumulate blobs.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SessionUrls {
    pub(crate) source: String,
    pub(crate) artifacts: Option<ConversionArtifacts>,
}

impl SessionUrls {
    pub(crate) fn new(source: String) -> Self {
        Self {
            source,
            artifacts: None,
        }
    }

    pub(crate) fn replace_artifacts(&mut self, next: ConversionArtifacts) {
        if let Some(previous) = self.artifacts.replace(next) {
            previous.release();
        }
    }

    pub(crate) fn release(&mut self) {
        if let Some(artifacts) = self.artifacts.take() {
            artifacts.release();
        }
        revoke_object_url(&self.source);
    }
}
