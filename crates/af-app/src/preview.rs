//! Prévisualisation interactive, indépendante du transport HTTP.
//!
//! The server loop owns a [`PreviewState`] and hands it to
//! [`PreviewState::handle`] for each request, in arrival order. Each
//! session key keeps its own active image.

use std::collections::VecDeque;
use std::path::PathBuf;

use af_ascii::Quantizer;
use af_core::{AsciiError, Settings};
use af_export::Rasterizer;
use af_source::folder::{list_image_names, resolve_entry};
use af_source::image::{decode_image, load_image};
use image::DynamicImage;
use serde::Serialize;

/// Session used when a request names none.
pub const DEFAULT_SESSION: &str = "default";

/// Active images kept at once. The oldest session is evicted beyond this.
pub const MAX_SESSIONS: usize = 16;

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Requête déjà extraite du transport.
#[derive(Clone, Debug, Default)]
pub struct PreviewRequest {
    /// HTTP method, upper case.
    pub method: String,
    /// Path without query string.
    pub path: String,
    /// Raw query string, without `?`.
    pub query: String,
    /// `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Raw body.
    pub body: Vec<u8>,
    /// `X-Session` header, if any.
    pub session: Option<String>,
}

impl PreviewRequest {
    fn query_pairs(&self) -> Vec<(String, String)> {
        form_urlencoded::parse(self.query.as_bytes())
            .into_owned()
            .collect()
    }

    fn mime(&self) -> String {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    fn is_image_upload(&self) -> bool {
        let mime = self.mime();
        !self.body.is_empty() && (mime.starts_with("image/") || mime == "application/octet-stream")
    }

    /// Settings parameters carried by a form or JSON body.
    fn body_params(&self) -> Result<Vec<(String, String)>, ApiError> {
        match self.mime().as_str() {
            "application/x-www-form-urlencoded" => {
                Ok(form_urlencoded::parse(&self.body).into_owned().collect())
            }
            "application/json" if !self.body.is_empty() => {
                let value: serde_json::Value = serde_json::from_slice(&self.body)
                    .map_err(|e| ApiError::new(400, format!("JSON invalide : {e}")))?;
                let serde_json::Value::Object(map) = value else {
                    return Err(ApiError::new(400, "JSON objet attendu"));
                };
                Ok(map
                    .into_iter()
                    .filter_map(|(k, v)| match v {
                        serde_json::Value::Null => None,
                        serde_json::Value::String(s) => Some((k, s)),
                        other => Some((k, other.to_string())),
                    })
                    .collect())
            }
            _ => Ok(Vec::new()),
        }
    }

    fn session_key(&self) -> String {
        self.session
            .clone()
            .or_else(|| {
                self.query_pairs()
                    .into_iter()
                    .find_map(|(k, v)| (k == "session").then_some(v))
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION.to_string())
    }
}

/// Réponse à renvoyer telle quelle par le transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header.
    pub content_type: &'static str,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl PreviewResponse {
    fn json<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        let body = serde_json::to_vec(value).map_err(|e| ApiError::new(500, e.to_string()))?;
        Ok(Self {
            status: 200,
            content_type: "application/json",
            body,
        })
    }

    fn png(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "image/png",
            body,
        }
    }

    /// `{"error": message}` with `status`.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: serde_json::json!({ "error": message }).to_string().into_bytes(),
        }
    }
}

#[derive(Debug)]
struct ApiError {
    status: u16,
    message: String,
}

impl ApiError {
    fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found() -> Self {
        Self::new(404, "Not found")
    }
}

impl From<AsciiError> for ApiError {
    fn from(e: AsciiError) -> Self {
        Self::new(e.status_code(), e.to_string())
    }
}

#[derive(Serialize)]
struct FileList {
    files: Vec<String>,
}

#[derive(Serialize)]
struct Selected<'a> {
    ok: bool,
    name: &'a str,
}

/// État de la prévisualisation : une image active par session.
pub struct PreviewState {
    input_dir: PathBuf,
    base: Settings,
    /// Du plus ancien au plus récent, au plus [`MAX_SESSIONS`] entrées.
    sessions: VecDeque<(String, DynamicImage)>,
    quantizer: Quantizer,
}

impl PreviewState {
    /// `input_dir` backs `/api/list_input` and `/api/select`; `base` is
    /// the settings request parameters are layered over.
    #[must_use]
    pub fn new(input_dir: impl Into<PathBuf>, base: Settings) -> Self {
        Self {
            input_dir: input_dir.into(),
            base,
            sessions: VecDeque::new(),
            quantizer: Quantizer::new(),
        }
    }

    /// Active image of `session`, if one was uploaded or selected.
    #[must_use]
    pub fn active(&self, session: &str) -> Option<&DynamicImage> {
        self.sessions
            .iter()
            .find(|(key, _)| key == session)
            .map(|(_, image)| image)
    }

    /// Number of sessions currently holding an image.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Remplace l'image de `session`, qui devient la plus récente.
    fn set_active(&mut self, session: String, image: DynamicImage) {
        self.sessions.retain(|(key, _)| *key != session);
        while self.sessions.len() >= MAX_SESSIONS {
            if let Some((evicted, _)) = self.sessions.pop_front() {
                log::debug!("Session {evicted} évincée");
            }
        }
        self.sessions.push_back((session, image));
    }

    /// Route one request. Never fails: errors become JSON responses.
    pub fn handle(&mut self, request: &PreviewRequest) -> PreviewResponse {
        let result = match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/") => Ok(PreviewResponse {
                status: 200,
                content_type: "text/html; charset=utf-8",
                body: INDEX_HTML.as_bytes().to_vec(),
            }),
            ("POST", "/api/preview") => self.preview(request),
            ("GET", "/api/settings") => PreviewResponse::json(&Settings::default()),
            ("GET", "/api/list_input") => self.list_input(),
            ("POST", "/api/select") => self.select(request),
            _ => Err(ApiError::not_found()),
        };
        result.unwrap_or_else(|e| {
            log::warn!(
                "{} {} → {} {}",
                request.method,
                request.path,
                e.status,
                e.message
            );
            PreviewResponse::error(e.status, &e.message)
        })
    }

    fn preview(&mut self, request: &PreviewRequest) -> Result<PreviewResponse, ApiError> {
        let session = request.session_key();
        let mut params = request.query_pairs();
        if request.is_image_upload() {
            let image = decode_image(&request.body)?;
            log::info!(
                "Session {session} : nouvelle image {}×{}",
                image.width(),
                image.height()
            );
            self.set_active(session.clone(), image);
        } else {
            params.extend(request.body_params()?);
        }

        let image = self
            .sessions
            .iter()
            .find_map(|(key, image)| (*key == session).then_some(image))
            .ok_or_else(|| ApiError::new(400, "No image uploaded yet"))?;
        let settings = self.base.clone().with_params(params)?;
        let text = self.quantizer.quantize(image, &settings)?.to_text();
        let png = Rasterizer::new(&settings)?.render_png(&text)?;
        Ok(PreviewResponse::png(png))
    }

    fn list_input(&self) -> Result<PreviewResponse, ApiError> {
        let files = list_image_names(&self.input_dir)
            .map_err(|e| ApiError::new(500, e.to_string()))?;
        PreviewResponse::json(&FileList { files })
    }

    fn select(&mut self, request: &PreviewRequest) -> Result<PreviewResponse, ApiError> {
        let name = request
            .query_pairs()
            .into_iter()
            .chain(request.body_params()?)
            .find_map(|(k, v)| (k == "name").then_some(v))
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::new(400, "Missing name"))?;
        let path = resolve_entry(&self.input_dir, &name).map_err(|_| ApiError::not_found())?;
        let image = load_image(&path)?;

        let session = request.session_key();
        log::info!("Session {session} : sélection de {name}");
        self.set_active(session, image);
        PreviewResponse::json(&Selected { ok: true, name: &name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32, v: u8) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(GrayImage::from_pixel(w, h, Luma([v])))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn get(path: &str) -> PreviewRequest {
        PreviewRequest {
            method: "GET".into(),
            path: path.into(),
            ..PreviewRequest::default()
        }
    }

    fn post(path: &str, query: &str) -> PreviewRequest {
        PreviewRequest {
            method: "POST".into(),
            path: path.into(),
            query: query.into(),
            ..PreviewRequest::default()
        }
    }

    fn upload(query: &str, body: Vec<u8>) -> PreviewRequest {
        PreviewRequest {
            content_type: Some("image/png".into()),
            body,
            ..post("/api/preview", query)
        }
    }

    fn error_of(resp: &PreviewResponse) -> String {
        let v: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        v["error"].as_str().unwrap().to_string()
    }

    fn state() -> PreviewState {
        PreviewState::new("/definitely/not/an/input/dir", Settings::default())
    }

    #[test]
    fn index_page() {
        let resp = state().handle(&get("/"));
        assert_eq!(resp.status, 200);
        assert!(resp.content_type.starts_with("text/html"));
        let page = String::from_utf8(resp.body).unwrap();
        assert!(page.contains("/api/preview"));
        for field in af_core::schema::FIELDS {
            assert!(page.contains(&format!("id=\"{}\"", field.name)), "{}", field.name);
        }
    }

    #[test]
    fn font_path_param_falls_back_to_builtin() {
        let mut st = state();
        assert_eq!(st.handle(&upload("output_width=4", png_bytes(8, 8, 60))).status, 200);
        let dir = tempfile::tempdir().unwrap();
        let query = format!("output_width=4&font_path={}", dir.path().display());
        assert_eq!(st.handle(&post("/api/preview", &query)).status, 200);
        assert_eq!(st.handle(&post("/api/preview", "output_width=4&font_path=")).status, 200);
    }

    #[test]
    fn preview_without_image_is_400() {
        let resp = state().handle(&post("/api/preview", ""));
        assert_eq!(resp.status, 400);
        assert_eq!(resp.content_type, "application/json");
        assert_eq!(error_of(&resp), "No image uploaded yet");
    }

    #[test]
    fn upload_then_reuse_active_image() {
        let mut st = state();
        let resp = st.handle(&upload("output_width=6&char_aspect=1", png_bytes(12, 6, 120)));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type, "image/png");

        let settings = Settings {
            output_width: 6,
            char_aspect: 1.0,
            ..Settings::default()
        };
        let cell = Rasterizer::new(&settings).unwrap().cell_size();
        let img = image::load_from_memory(&resp.body).unwrap();
        assert_eq!((img.width(), img.height()), (6 * cell.width, 3 * cell.height));

        let again = st.handle(&post("/api/preview", "output_width=6&char_aspect=1"));
        assert_eq!(again.status, 200);
        assert_eq!(again.body, resp.body);
    }

    #[test]
    fn sessions_are_isolated() {
        let mut st = state();
        let mut first = upload("", png_bytes(4, 4, 200));
        first.session = Some("alice".into());
        assert_eq!(st.handle(&first).status, 200);
        assert!(st.active("alice").is_some());
        assert!(st.active(DEFAULT_SESSION).is_none());

        assert_eq!(st.handle(&post("/api/preview", "")).status, 400);
        assert_eq!(st.handle(&post("/api/preview", "session=alice")).status, 200);
    }

    #[test]
    fn session_map_is_bounded() {
        let mut st = state();
        for i in 0..50 {
            let mut req = upload("", png_bytes(2, 2, 90));
            req.session = Some(format!("client-{i}"));
            assert_eq!(st.handle(&req).status, 200);
            assert!(st.session_count() <= MAX_SESSIONS);
        }
        assert_eq!(st.session_count(), MAX_SESSIONS);
        assert!(st.active("client-49").is_some());
        assert!(st.active("client-0").is_none());
        assert!(st.active(&format!("client-{}", 50 - MAX_SESSIONS)).is_some());
        assert!(st.active(&format!("client-{}", 49 - MAX_SESSIONS)).is_none());
    }

    #[test]
    fn reupload_refreshes_session_age() {
        let mut st = state();
        for i in 0..MAX_SESSIONS {
            let mut req = upload("", png_bytes(2, 2, 90));
            req.session = Some(format!("client-{i}"));
            assert_eq!(st.handle(&req).status, 200);
        }
        let mut again = upload("", png_bytes(3, 3, 10));
        again.session = Some("client-0".into());
        assert_eq!(st.handle(&again).status, 200);
        assert_eq!(st.session_count(), MAX_SESSIONS);

        let mut fresh = upload("", png_bytes(2, 2, 90));
        fresh.session = Some("newcomer".into());
        assert_eq!(st.handle(&fresh).status, 200);
        assert_eq!(st.active("client-0").map(DynamicImage::width), Some(3));
        assert!(st.active("client-1").is_none());
        assert!(st.active("newcomer").is_some());
    }

    #[test]
    fn garbage_upload_is_400() {
        let mut st = state();
        let resp = st.handle(&upload("", b"not an image".to_vec()));
        assert_eq!(resp.status, 400);
        assert!(st.active(DEFAULT_SESSION).is_none());
    }

    #[test]
    fn invalid_settings_are_400_and_unparseable_fall_back() {
        let mut st = state();
        assert_eq!(st.handle(&upload("", png_bytes(4, 4, 90))).status, 200);
        assert_eq!(st.handle(&post("/api/preview", "fg_color=plaid")).status, 400);
        assert_eq!(st.handle(&post("/api/preview", "output_width=0")).status, 400);
        assert_eq!(st.handle(&post("/api/preview", "output_width=abc")).status, 200);
    }

    #[test]
    fn form_and_json_bodies_carry_settings() {
        let mut st = state();
        assert_eq!(st.handle(&upload("", png_bytes(8, 8, 90))).status, 200);
        let settings = Settings {
            output_width: 3,
            ..Settings::default()
        };
        let cell = Rasterizer::new(&settings).unwrap().cell_size();

        let form = PreviewRequest {
            content_type: Some("application/x-www-form-urlencoded".into()),
            body: b"output_width=3".to_vec(),
            ..post("/api/preview", "")
        };
        let resp = st.handle(&form);
        assert_eq!(resp.status, 200);
        assert_eq!(image::load_from_memory(&resp.body).unwrap().width(), 3 * cell.width);

        let json = PreviewRequest {
            content_type: Some("application/json".into()),
            body: br#"{"output_width": 3, "invert": true, "font_path": null}"#.to_vec(),
            ..post("/api/preview", "")
        };
        let resp = st.handle(&json);
        assert_eq!(resp.status, 200);
        assert_eq!(image::load_from_memory(&resp.body).unwrap().width(), 3 * cell.width);

        let broken = PreviewRequest {
            content_type: Some("application/json".into()),
            body: b"{".to_vec(),
            ..post("/api/preview", "")
        };
        assert_eq!(st.handle(&broken).status, 400);
    }

    #[test]
    fn settings_endpoint_returns_defaults() {
        let resp = state().handle(&get("/api/settings"));
        assert_eq!(resp.status, 200);
        let back: Settings = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(back, Settings::default());
    }

    #[test]
    fn list_input_sorted_or_500() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.jpg", "readme.md"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let resp = PreviewState::new(dir.path(), Settings::default()).handle(&get("/api/list_input"));
        assert_eq!(resp.status, 200);
        let v: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(v, serde_json::json!({ "files": ["a.jpg", "b.png"] }));

        let resp = state().handle(&get("/api/list_input"));
        assert_eq!(resp.status, 500);
    }

    #[test]
    fn select_rules() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.png"), png_bytes(4, 2, 160)).unwrap();
        std::fs::write(dir.path().join("bad.png"), b"corrupt").unwrap();
        let mut st = PreviewState::new(dir.path(), Settings::default());

        let missing = st.handle(&post("/api/select", ""));
        assert_eq!(missing.status, 400);
        let traversal = st.handle(&post("/api/select", "name=..%2Fgood.png"));
        assert_eq!((traversal.status, error_of(&traversal).as_str()), (404, "Not found"));
        assert_eq!(st.handle(&post("/api/select", "name=absent.png")).status, 404);
        assert_eq!(st.handle(&post("/api/select", "name=bad.png")).status, 400);
        assert!(st.active(DEFAULT_SESSION).is_none());

        let ok = st.handle(&post("/api/select", "name=good.png"));
        assert_eq!(ok.status, 200);
        let v: serde_json::Value = serde_json::from_slice(&ok.body).unwrap();
        assert_eq!(v, serde_json::json!({ "ok": true, "name": "good.png" }));
        assert_eq!(st.handle(&post("/api/preview", "")).status, 200);
    }

    #[test]
    fn unknown_routes_are_404() {
        let mut st = state();
        assert_eq!(st.handle(&get("/nope")).status, 404);
        assert_eq!(st.handle(&get("/api/preview")).status, 404);
        assert_eq!(st.handle(&post("/api/settings", "")).status, 404);
    }
}
