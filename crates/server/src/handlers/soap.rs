//! XML request/response endpoint.
//!
//! The root element of the request document names the operation:
//!
//! ```text
//! <CreatePost><title>A</title><content>x</content></CreatePost>
//! <GetPost><id>1</id></GetPost>
//! <ListPosts/>
//! <UpdatePost><id>1</id><title>A2</title><content>x2</content></UpdatePost>
//! <DeletePost><id>1</id></DeletePost>
//! ```
//!
//! Replies are `<{Operation}Response>` documents carrying `<post>` elements,
//! or a `<Fault>` document on failure.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use posts_core::{Post, PostsError};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AppState;

const XML_CONTENT_TYPE: &str = "text/xml";

#[derive(Debug, Deserialize)]
struct CreatePostRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct PostIdRequest {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct UpdatePostRequest {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct SinglePost<'a> {
    post: &'a Post,
}

#[derive(Serialize)]
struct PostList<'a> {
    post: &'a [Post],
}

#[derive(Serialize)]
struct DeleteResult {
    deleted: bool,
}

#[derive(Serialize)]
struct FaultBody<'a> {
    faultcode: &'a str,
    faultstring: &'a str,
}

/// Error reply rendered as a `<Fault>` document.
#[derive(Debug)]
pub struct SoapFault {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl SoapFault {
    fn client(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "Client",
            message: message.into(),
        }
    }

    fn server(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "Server",
            message: message.into(),
        }
    }
}

impl From<PostsError> for SoapFault {
    fn from(err: PostsError) -> Self {
        match err {
            PostsError::NotFound { .. } => Self {
                status: StatusCode::NOT_FOUND,
                code: "Client",
                message: err.to_string(),
            },
            other => SoapFault::server(other.to_string()),
        }
    }
}

impl IntoResponse for SoapFault {
    fn into_response(self) -> Response {
        let body = FaultBody {
            faultcode: self.code,
            faultstring: &self.message,
        };
        match quick_xml::se::to_string_with_root("Fault", &body) {
            Ok(xml) => {
                (self.status, [(header::CONTENT_TYPE, XML_CONTENT_TYPE)], xml).into_response()
            }
            Err(e) => {
                warn!("Failed to encode fault: {}", e);
                self.status.into_response()
            }
        }
    }
}

/// POST /soap
pub async fn soap_handler(State(state): State<AppState>, body: Bytes) -> Response {
    match dispatch(&state, &body) {
        Ok(xml) => ([(header::CONTENT_TYPE, XML_CONTENT_TYPE)], xml).into_response(),
        Err(fault) => {
            info!("POST /soap - fault: {}", fault.message);
            fault.into_response()
        }
    }
}

fn dispatch(state: &AppState, body: &[u8]) -> Result<String, SoapFault> {
    let document = std::str::from_utf8(body)
        .map_err(|e| SoapFault::client(format!("request is not UTF-8: {e}")))?;
    let operation = root_element(document)?;
    info!("POST /soap - {}", operation);

    let store = &state.store;
    match operation.as_str() {
        "CreatePost" => {
            let req: CreatePostRequest = parse(document)?;
            let post = store.create(req.title, req.content);
            encode("CreatePostResponse", &SinglePost { post: &post })
        }
        "GetPost" => {
            let req: PostIdRequest = parse(document)?;
            let post = store.get(req.id)?;
            encode("GetPostResponse", &SinglePost { post: &post })
        }
        "ListPosts" => {
            let posts = store.list();
            encode("ListPostsResponse", &PostList { post: &posts })
        }
        "UpdatePost" => {
            let req: UpdatePostRequest = parse(document)?;
            let post = store.update(req.id, req.title, req.content)?;
            encode("UpdatePostResponse", &SinglePost { post: &post })
        }
        "DeletePost" => {
            let req: PostIdRequest = parse(document)?;
            let deleted = store.delete(req.id);
            encode("DeletePostResponse", &DeleteResult { deleted })
        }
        other => Err(SoapFault::client(format!("unknown operation: {other}"))),
    }
}

/// Local name of the first element in the document.
fn root_element(document: &str) -> Result<String, SoapFault> {
    let mut reader = Reader::from_str(document);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => return Err(SoapFault::client("empty request document")),
            Ok(_) => continue,
            Err(e) => return Err(SoapFault::client(format!("malformed XML: {e}"))),
        }
    }
}

fn parse<T: DeserializeOwned>(document: &str) -> Result<T, SoapFault> {
    quick_xml::de::from_str(document)
        .map_err(|e| SoapFault::client(format!("invalid request: {e}")))
}

fn encode<T: Serialize>(root: &str, value: &T) -> Result<String, SoapFault> {
    quick_xml::se::to_string_with_root(root, value)
        .map_err(|e| SoapFault::server(format!("failed to encode response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_element_skips_declaration() {
        let doc = r#"<?xml version="1.0"?><!-- c --><CreatePost><title>A</title></CreatePost>"#;
        assert_eq!(root_element(doc).unwrap(), "CreatePost");
    }

    #[test]
    fn test_root_element_empty_tag() {
        assert_eq!(root_element("<ListPosts/>").unwrap(), "ListPosts");
    }

    #[test]
    fn test_root_element_empty_document() {
        let fault = root_element("   ").unwrap_err();
        assert_eq!(fault.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_parse_create_request() {
        let req: CreatePostRequest =
            parse("<CreatePost><title>Hi</title><content>there</content></CreatePost>").unwrap();
        assert_eq!(req.title, "Hi");
        assert_eq!(req.content, "there");
    }

    #[test]
    fn test_parse_rejects_non_numeric_id() {
        let fault = parse::<PostIdRequest>("<GetPost><id>abc</id></GetPost>").unwrap_err();
        assert_eq!(fault.code, "Client");
    }

    #[test]
    fn test_encode_single_post() {
        let post = Post {
            id: 1,
            title: "A".into(),
            content: "x".into(),
        };
        let xml = encode("CreatePostResponse", &SinglePost { post: &post }).unwrap();
        assert_eq!(
            xml,
            "<CreatePostResponse><post><id>1</id><title>A</title><content>x</content></post></CreatePostResponse>"
        );
    }

    #[test]
    fn test_not_found_fault_status() {
        let fault = SoapFault::from(PostsError::NotFound { id: 5 });
        assert_eq!(fault.status, StatusCode::NOT_FOUND);
        assert_eq!(fault.message, "Post 5 not found");
    }
}
