//! Issue-tracker REST client.
//!
//! Mutating calls succeed only on HTTP 204; anything else becomes
//! [`BugfixError::RemoteTransitionFailed`] carrying the status and the
//! tracker's own error text. Read calls expect 200.

use crate::error::{BugfixError, Result};
use crate::fix_version::FixVersion;
use crate::issue::{Issue, IssueKind};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// TransitionRequest
// ---------------------------------------------------------------------------

/// One workflow transition with its optional side updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionRequest {
    pub transition_id: String,
    pub fix_version_id: Option<String>,
    pub comment: Option<String>,
}

impl TransitionRequest {
    pub fn new(transition_id: &str) -> Self {
        Self {
            transition_id: transition_id.to_string(),
            fix_version_id: None,
            comment: None,
        }
    }

    pub fn with_fix_version(mut self, id: &str) -> Self {
        self.fix_version_id = Some(id.to_string());
        self
    }

    pub fn with_comment(mut self, body: &str) -> Self {
        self.comment = Some(body.to_string());
        self
    }

    /// JSON body for `POST issue/{id}/transitions`.
    pub fn body(&self) -> Value {
        let mut body = json!({ "transition": { "id": self.transition_id } });
        let mut update = serde_json::Map::new();
        if let Some(id) = &self.fix_version_id {
            update.insert("fixVersions".to_string(), json!([{ "add": { "id": id } }]));
        }
        if let Some(comment) = &self.comment {
            update.insert("comment".to_string(), json!([{ "add": { "body": comment } }]));
        }
        if !update.is_empty() {
            body["update"] = Value::Object(update);
        }
        body
    }
}

// ---------------------------------------------------------------------------
// IssueTracker
// ---------------------------------------------------------------------------

pub trait IssueTracker {
    /// True when the configured credentials are accepted.
    fn verify_credentials(&self) -> Result<bool>;

    fn issue_exists(&self, issue: &Issue) -> Result<bool>;

    /// Release versions of the request project.
    fn fix_versions(&self) -> Result<Vec<FixVersion>>;

    /// Creation issues linked to `application`, in the order the tracker lists them.
    fn linked_creation_issues(&self, application: &Issue) -> Result<Vec<Issue>>;

    fn transition(&self, issue: &Issue, request: &TransitionRequest) -> Result<()>;

    /// Set the assignee and append a comment in one edit.
    fn assign_and_comment(&self, issue: &Issue, account_id: &str, comment: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IssuePayload {
    #[serde(default)]
    key: String,
    #[serde(default)]
    fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
struct IssueFields {
    #[serde(default)]
    issuelinks: Vec<IssueLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueLink {
    outward_issue: Option<LinkedIssue>,
    inward_issue: Option<LinkedIssue>,
}

#[derive(Debug, Deserialize)]
struct LinkedIssue {
    key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorPayload {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: serde_json::Map<String, Value>,
}

/// Keys of linked creation issues; an outward link takes precedence over an
/// inward one on the same entry.
fn linked_creation_keys(links: &[IssueLink]) -> Vec<String> {
    let marker = format!("{}-", IssueKind::Creation.prefix());
    links
        .iter()
        .filter_map(|link| link.outward_issue.as_ref().or(link.inward_issue.as_ref()))
        .filter(|issue| issue.key.starts_with(&marker))
        .map(|issue| issue.key.clone())
        .collect()
}

/// Human-readable reason from a failed response body, falling back to the
/// status line.
fn failure_reason(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        let mut parts = payload.error_messages;
        parts.extend(payload.errors.iter().map(|(field, msg)| match msg.as_str() {
            Some(text) => format!("{field}: {text}"),
            None => format!("{field}: {msg}"),
        }));
        if !parts.is_empty() {
            return parts.join("; ");
        }
    }
    status
        .canonical_reason()
        .unwrap_or("unexpected response")
        .to_string()
}

// ---------------------------------------------------------------------------
// JiraClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct JiraClient {
    base_url: String,
    email: String,
    token: String,
    http: Client,
}

impl JiraClient {
    pub fn new(base_url: &str, email: &str, token: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("bugfix/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            email: email.to_string(),
            token: token.to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .basic_auth(&self.email, Some(&self.token))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    fn get(&self, path: &str) -> Result<Response> {
        debug!(path, "tracker GET");
        Ok(self.authed(self.http.get(self.url(path))).send()?)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.get(path)?;
        let status = response.status();
        let body = response.text()?;
        if status != StatusCode::OK {
            return Err(BugfixError::Tracker(format!(
                "GET {path} returned {}: {}",
                status.as_u16(),
                failure_reason(status, &body)
            )));
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn expect_no_content(response: Response) -> Result<()> {
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(BugfixError::RemoteTransitionFailed {
            status: status.as_u16(),
            reason: failure_reason(status, &body),
        })
    }
}

impl IssueTracker for JiraClient {
    fn verify_credentials(&self) -> Result<bool> {
        Ok(self.get("myself")?.status() == StatusCode::OK)
    }

    fn issue_exists(&self, issue: &Issue) -> Result<bool> {
        let response = self.get(&issue.endpoint())?;
        if response.status() != StatusCode::OK {
            return Ok(false);
        }
        let payload: IssuePayload = response.json()?;
        Ok(payload.key == issue.id())
    }

    fn fix_versions(&self) -> Result<Vec<FixVersion>> {
        let path = format!("project/{}/versions", IssueKind::Request.prefix());
        self.get_json(&path)
    }

    fn linked_creation_issues(&self, application: &Issue) -> Result<Vec<Issue>> {
        let payload: IssuePayload = self.get_json(&application.endpoint())?;
        let issues = linked_creation_keys(&payload.fields.issuelinks)
            .iter()
            .filter_map(|key| {
                let issue = Issue::from_tracker_key(IssueKind::Creation, key);
                if issue.is_none() {
                    warn!(key = key.as_str(), "skipping unrecognised linked issue key");
                }
                issue
            })
            .collect();
        Ok(issues)
    }

    fn transition(&self, issue: &Issue, request: &TransitionRequest) -> Result<()> {
        let path = issue.transitions_endpoint();
        debug!(path = path.as_str(), transition = request.transition_id.as_str(), "tracker POST");
        let response = self
            .authed(self.http.post(self.url(&path)))
            .json(&request.body())
            .send()?;
        Self::expect_no_content(response)
    }

    fn assign_and_comment(&self, issue: &Issue, account_id: &str, comment: &str) -> Result<()> {
        let path = issue.endpoint();
        debug!(path = path.as_str(), account_id, "tracker PUT");
        let body = json!({
            "fields": { "assignee": { "accountId": account_id } },
            "update": { "comment": [{ "add": { "body": comment } }] },
        });
        let response = self
            .authed(self.http.put(self.url(&path)))
            .json(&body)
            .send()?;
        Self::expect_no_content(response)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client(server: &Server) -> JiraClient {
        JiraClient::new(&server.url(), "dev@example.com", "token").unwrap()
    }

    #[test]
    fn planned_body_attaches_fix_version() {
        let body = TransitionRequest::new("281").with_fix_version("10412").body();
        assert_eq!(
            body,
            json!({
                "transition": { "id": "281" },
                "update": { "fixVersions": [{ "add": { "id": "10412" } }] },
            })
        );
    }

    #[test]
    fn plain_transition_has_no_update() {
        let body = TransitionRequest::new("291").body();
        assert_eq!(body, json!({ "transition": { "id": "291" } }));
    }

    #[test]
    fn closed_body_carries_comment() {
        let body = TransitionRequest::new("191").with_comment("fixed typo").body();
        assert_eq!(body["update"]["comment"][0]["add"]["body"], "fixed typo");
    }

    #[test]
    fn transition_succeeds_on_204() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/issue/CHLRQ-12/transitions")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .match_body(Matcher::Json(json!({ "transition": { "id": "291" } })))
            .with_status(204)
            .create();

        let issue = Issue::request("12").unwrap();
        client(&server)
            .transition(&issue, &TransitionRequest::new("291"))
            .unwrap();
        mock.assert();
    }

    #[test]
    fn transition_failure_carries_status_and_reason() {
        let mut server = Server::new();
        server
            .mock("POST", "/issue/CHLRQ-12/transitions")
            .with_status(400)
            .with_body(r#"{"errorMessages":["Transition id '281' is not valid for this issue."],"errors":{}}"#)
            .create();

        let issue = Issue::request("12").unwrap();
        let err = client(&server)
            .transition(&issue, &TransitionRequest::new("281"))
            .unwrap_err();
        match err {
            BugfixError::RemoteTransitionFailed { status, reason } => {
                assert_eq!(status, 400);
                assert!(reason.contains("not valid"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn ok_status_is_not_success_for_mutations() {
        let mut server = Server::new();
        server
            .mock("PUT", "/issue/CHLC-7")
            .with_status(200)
            .create();

        let issue = Issue::creation("7").unwrap();
        let err = client(&server)
            .assign_and_comment(&issue, "acct", "CHLRQ-12")
            .unwrap_err();
        assert!(matches!(err, BugfixError::RemoteTransitionFailed { status: 200, .. }));
    }

    #[test]
    fn assign_and_comment_sends_one_edit() {
        let mut server = Server::new();
        let mock = server
            .mock("PUT", "/issue/CHLC-7")
            .match_body(Matcher::Json(json!({
                "fields": { "assignee": { "accountId": "acct-1" } },
                "update": { "comment": [{ "add": { "body": "CHLRQ-12" } }] },
            })))
            .with_status(204)
            .create();

        let issue = Issue::creation("7").unwrap();
        client(&server)
            .assign_and_comment(&issue, "acct-1", "CHLRQ-12")
            .unwrap();
        mock.assert();
    }

    #[test]
    fn fix_versions_reads_request_project() {
        let mut server = Server::new();
        server
            .mock("GET", "/project/CHLRQ/versions")
            .with_status(200)
            .with_body(r#"[{"id":"1","name":"2024 Sep"},{"id":"2","name":"2024 Oct","archived":false}]"#)
            .create();

        let versions = client(&server).fix_versions().unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[1].name, "2024 Oct");
    }

    #[test]
    fn linked_issues_keep_only_creation_keys_in_order() {
        let mut server = Server::new();
        server
            .mock("GET", "/issue/CHLC-100")
            .with_status(200)
            .with_body(
                r#"{"key":"CHLC-100","fields":{"issuelinks":[
                    {"outwardIssue":{"key":"CHLC-12"}},
                    {"inwardIssue":{"key":"CHLRQ-5"}},
                    {"inwardIssue":{"key":"CHLC-3"}},
                    {"type":{"name":"Relates"}}
                ]}}"#,
            )
            .create();

        let app = Issue::creation("100").unwrap();
        let linked = client(&server).linked_creation_issues(&app).unwrap();
        let ids: Vec<String> = linked.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["CHLC-12", "CHLC-3"]);
    }

    #[test]
    fn linked_issues_accept_long_tracker_keys() {
        let mut server = Server::new();
        server
            .mock("GET", "/issue/CHLC-100")
            .with_status(200)
            .with_body(
                r#"{"key":"CHLC-100","fields":{"issuelinks":[
                    {"outwardIssue":{"key":"CHLC-12"}},
                    {"outwardIssue":{"key":"CHLC-10234"}},
                    {"inwardIssue":{"key":"CHLC-bad"}}
                ]}}"#,
            )
            .create();

        let app = Issue::creation("100").unwrap();
        let linked = client(&server).linked_creation_issues(&app).unwrap();
        let ids: Vec<String> = linked.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["CHLC-12", "CHLC-10234"]);
    }

    #[test]
    fn linked_lookup_error_is_reported() {
        let mut server = Server::new();
        server
            .mock("GET", "/issue/CHLC-100")
            .with_status(404)
            .with_body(r#"{"errorMessages":["Issue does not exist"]}"#)
            .create();

        let app = Issue::creation("100").unwrap();
        let err = client(&server).linked_creation_issues(&app).unwrap_err();
        assert!(err.to_string().contains("Issue does not exist"));
    }

    #[test]
    fn issue_exists_compares_key() {
        let mut server = Server::new();
        server
            .mock("GET", "/issue/CHLRQ-12")
            .with_status(200)
            .with_body(r#"{"key":"CHLRQ-12","fields":{}}"#)
            .create();
        server
            .mock("GET", "/issue/CHLRQ-13")
            .with_status(404)
            .create();

        let tracker = client(&server);
        assert!(tracker.issue_exists(&Issue::request("12").unwrap()).unwrap());
        assert!(!tracker.issue_exists(&Issue::request("13").unwrap()).unwrap());
    }

    #[test]
    fn credentials_are_checked_against_myself() {
        let mut server = Server::new();
        server.mock("GET", "/myself").with_status(401).create();
        assert!(!client(&server).verify_credentials().unwrap());
    }
}
