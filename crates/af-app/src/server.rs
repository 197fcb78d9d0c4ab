use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use tiny_http::{Header, Request, Response, Server};

use crate::preview::{PreviewRequest, PreviewResponse, PreviewState};

/// Upload size cap.
const MAX_BODY: u64 = 32 * 1024 * 1024;

/// Polling interval of the accept loop, bounds Ctrl-C latency.
const POLL: Duration = Duration::from_millis(250);

/// Sert la prévisualisation sur `addr` jusqu'à Ctrl-C.
///
/// Boucle mono-thread : les requêtes sont traitées dans l'ordre d'arrivée
/// avec le même `state`.
///
/// # Errors
/// Returns an error if the address cannot be bound or the Ctrl-C handler
/// cannot be installed.
pub fn serve(addr: &str, state: &mut PreviewState) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("Impossible d'écouter sur {addr} : {e}"))?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .context("Impossible d'installer le gestionnaire Ctrl-C")?;

    log::info!("Prévisualisation sur http://{addr} (Ctrl-C pour arrêter)");
    while running.load(Ordering::SeqCst) {
        match server.recv_timeout(POLL) {
            Ok(Some(request)) => handle(request, state),
            Ok(None) => {}
            Err(e) => log::error!("Erreur de réception : {e}"),
        }
    }
    log::info!("Arrêt de la prévisualisation");
    Ok(())
}

fn handle(mut request: Request, state: &mut PreviewState) {
    let response = match to_preview_request(&mut request) {
        Ok(req) => {
            let resp = state.handle(&req);
            log::info!("{} {} → {}", req.method, req.path, resp.status);
            resp
        }
        Err(resp) => resp,
    };
    if let Err(e) = request.respond(to_http_response(response)) {
        log::warn!("Réponse non envoyée : {e}");
    }
}

fn to_preview_request(request: &mut Request) -> Result<PreviewRequest, PreviewResponse> {
    let (path, query) = split_url(request.url());
    let (path, query) = (path.to_string(), query.to_string());
    let content_type = header(request, "Content-Type");
    let session = header(request, "X-Session");

    let body = match read_body(request.as_reader(), MAX_BODY) {
        Ok(Some(body)) => body,
        Ok(None) => {
            log::warn!("Corps de requête au-delà de {MAX_BODY} octets : {path}");
            return Err(PreviewResponse::error(413, "Payload too large"));
        }
        Err(e) => {
            log::warn!("Requête illisible : {e}");
            return Err(PreviewResponse::error(400, "Unreadable request body"));
        }
    };

    Ok(PreviewRequest {
        method: request.method().to_string(),
        path,
        query,
        content_type,
        body,
        session,
    })
}

/// Lit au plus `limit` octets. `None` si le corps dépasse la limite.
fn read_body(reader: &mut dyn Read, limit: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut body = Vec::new();
    reader.take(limit + 1).read_to_end(&mut body)?;
    if body.len() as u64 > limit {
        return Ok(None);
    }
    Ok(Some(body))
}

fn header(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

fn to_http_response(resp: PreviewResponse) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut response = Response::from_data(resp.body).with_status_code(resp.status);
    match Header::from_bytes(&b"Content-Type"[..], resp.content_type.as_bytes()) {
        Ok(h) => response.add_header(h),
        Err(()) => log::warn!("Content-Type invalide : {}", resp.content_type),
    }
    response
}

/// Split a request target into path and query string.
fn split_url(url: &str) -> (&str, &str) {
    url.split_once('?').unwrap_or((url, ""))
}
