use std::time::Duration;

use log::debug;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, CONNECTION, CONTENT_TYPE, COOKIE, DNT};
use serde_json::{json, Map, Value};

use gifcover_contracts::host::{CoverTarget, GroupImageSlot, ServerConnection, TagRecord};
use gifcover_contracts::{PluginError, PluginResult};

use crate::http::{response_text, send_failed, truncate_text};

const GRAPHQL_TARGET: &str = "GraphQL";
const ERROR_BODY_MAX_CHARS: usize = 2048;

const SCENE_COVER_MUTATION: &str = r#"
mutation setSceneCover($id: ID!, $imgSrc: String!) {
  sceneUpdate(input: {id: $id, cover_image: $imgSrc}) {
    id
    paths {
      screenshot
    }
  }
}
"#;

const TAG_COVER_MUTATION: &str = r#"
mutation setTagCover($id: ID!, $imgSrc: String!) {
  tagUpdate(input: {id: $id, image: $imgSrc}) {
    id
    image_path
  }
}
"#;

const PERFORMER_COVER_MUTATION: &str = r#"
mutation setPerformerCover($id: ID!, $imgSrc: String!) {
  performerUpdate(input: {id: $id, image: $imgSrc}) {
    id
    image_path
  }
}
"#;

const GROUP_FRONT_COVER_MUTATION: &str = r#"
mutation setGroupFrontCover($id: ID!, $imgSrc: String!) {
  groupUpdate(input: {id: $id, front_image: $imgSrc}) {
    id
    front_image_path
    back_image_path
  }
}
"#;

const GROUP_BACK_COVER_MUTATION: &str = r#"
mutation setGroupBackCover($id: ID!, $imgSrc: String!) {
  groupUpdate(input: {id: $id, back_image: $imgSrc}) {
    id
    front_image_path
    back_image_path
  }
}
"#;

const ALL_TAGS_QUERY: &str = r#"
{
  allTags {
    id
    name
    aliases
    image_path
  }
}
"#;

/// Executes one query against the host and returns its `data` object.
pub trait GraphqlTransport {
    fn execute(&self, query: &str, variables: Option<Value>) -> PluginResult<Value>;
}

pub struct HttpGraphqlTransport {
    url: String,
    session: Option<String>,
    http: HttpClient,
    timeout: Duration,
}

impl HttpGraphqlTransport {
    pub fn new(connection: &ServerConnection, http: HttpClient, timeout: Duration) -> Self {
        Self {
            url: connection.graphql_url(),
            session: connection.session().map(str::to_string),
            http,
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl GraphqlTransport for HttpGraphqlTransport {
    fn execute(&self, query: &str, variables: Option<Value>) -> PluginResult<Value> {
        let mut payload = Map::new();
        payload.insert("query".to_string(), Value::String(query.to_string()));
        if let Some(variables) = &variables {
            payload.insert("variables".to_string(), variables.clone());
        }

        let mut request = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(CONNECTION, "keep-alive")
            .header(DNT, "1")
            .timeout(self.timeout)
            .json(&Value::Object(payload));
        if let Some(session) = &self.session {
            request = request.header(COOKIE, format!("session={session}"));
        }

        let response = request
            .send()
            .map_err(|err| send_failed(GRAPHQL_TARGET, err))?;
        let (code, body) = response_text(GRAPHQL_TARGET, response)?;
        decode_graphql_response(code, &body, query, variables.as_ref())
    }
}

/// Status and body of a host response to its `data`, or the matching error.
pub fn decode_graphql_response(
    status: u16,
    body: &str,
    query: &str,
    variables: Option<&Value>,
) -> PluginResult<Value> {
    if !(200..300).contains(&status) {
        return Err(PluginError::Transport {
            target: GRAPHQL_TARGET.to_string(),
            status,
            body: truncate_text(body, ERROR_BODY_MAX_CHARS),
            query: Some(query.to_string()),
            variables: variables.cloned(),
        });
    }

    let parsed: Value = serde_json::from_str(body)
        .map_err(|err| PluginError::parse(format!("GraphQL returned invalid JSON payload: {err}")))?;

    let errors = parsed
        .get("error")
        .and_then(|error| error.get("errors"))
        .or_else(|| parsed.get("errors"))
        .and_then(Value::as_array);
    if let Some(first) = errors.and_then(|rows| rows.first()) {
        let message = first
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| first.to_string());
        return Err(PluginError::Application(message));
    }

    match parsed.get("data") {
        Some(data) if data.is_object() => Ok(data.clone()),
        _ => Err(PluginError::parse("GraphQL response has no data")),
    }
}

/// Cover updates and tag lookups against the host.
pub struct HostClient {
    transport: Box<dyn GraphqlTransport>,
}

impl HostClient {
    pub fn new(transport: Box<dyn GraphqlTransport>) -> Self {
        Self { transport }
    }

    pub fn connect(connection: &ServerConnection, http: HttpClient, timeout: Duration) -> Self {
        let transport = HttpGraphqlTransport::new(connection, http, timeout);
        debug!("host endpoint {}", transport.url());
        Self::new(Box::new(transport))
    }

    pub fn save_cover(&self, target: CoverTarget, id: &str, img_src: &str) -> PluginResult<Value> {
        match target {
            CoverTarget::Scene => self.save_scene_cover(id, img_src),
            CoverTarget::Tag => self.save_tag_cover(id, img_src),
            CoverTarget::Performer => self.save_performer_cover(id, img_src),
            CoverTarget::Group(slot) => self.save_group_cover(id, img_src, slot),
        }
    }

    pub fn save_scene_cover(&self, id: &str, img_src: &str) -> PluginResult<Value> {
        self.mutate(SCENE_COVER_MUTATION, "sceneUpdate", id, img_src)
    }

    pub fn save_tag_cover(&self, id: &str, img_src: &str) -> PluginResult<Value> {
        self.mutate(TAG_COVER_MUTATION, "tagUpdate", id, img_src)
    }

    pub fn save_performer_cover(&self, id: &str, img_src: &str) -> PluginResult<Value> {
        self.mutate(PERFORMER_COVER_MUTATION, "performerUpdate", id, img_src)
    }

    pub fn save_group_cover(
        &self,
        id: &str,
        img_src: &str,
        slot: GroupImageSlot,
    ) -> PluginResult<Value> {
        let mutation = match slot {
            GroupImageSlot::Front => GROUP_FRONT_COVER_MUTATION,
            GroupImageSlot::Back => GROUP_BACK_COVER_MUTATION,
        };
        self.mutate(mutation, "groupUpdate", id, img_src)
    }

    /// Tags still showing the host's generated image.
    pub fn default_image_tags(&self) -> PluginResult<Vec<TagRecord>> {
        let data = self.transport.execute(ALL_TAGS_QUERY, None)?;
        let rows = take_field(data, "allTags")?;
        let tags: Vec<TagRecord> = serde_json::from_value(rows)
            .map_err(|err| PluginError::parse(format!("unexpected allTags shape: {err}")))?;
        Ok(tags.into_iter().filter(TagRecord::has_default_image).collect())
    }

    fn mutate(&self, mutation: &str, field: &str, id: &str, img_src: &str) -> PluginResult<Value> {
        let variables = json!({"id": id, "imgSrc": img_src});
        let data = self.transport.execute(mutation, Some(variables))?;
        take_field(data, field)
    }
}

fn take_field(mut data: Value, field: &str) -> PluginResult<Value> {
    data.get_mut(field)
        .map(Value::take)
        .filter(|value| !value.is_null())
        .ok_or_else(|| PluginError::parse(format!("GraphQL response is missing '{field}'")))
}
