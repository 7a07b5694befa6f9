use log::{debug, info};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};

use gifcover_contracts::envelope::{PluginInput, PluginRequest};
use gifcover_contracts::host::ServerConnection;
use gifcover_contracts::{PluginError, PluginResult};

use crate::autofill::TagAutofill;
use crate::config::EngineConfig;
use crate::gallery::{GalleryFetcher, RemoteGallerySource, DEFAULT_SET_LIMIT};
use crate::host::HostClient;
use crate::http::build_client;

pub type HostConnector = Box<dyn Fn(&ServerConnection) -> HostClient>;

/// Routes one plugin request to the gallery fetcher or the host client.
pub struct Dispatcher {
    config: EngineConfig,
    gallery: GalleryFetcher,
    connect_host: HostConnector,
}

impl Dispatcher {
    pub fn new(config: EngineConfig) -> Self {
        let http = build_client();
        let gallery = GalleryFetcher::new(
            Box::new(RemoteGallerySource::new(
                config.api_url.clone(),
                http.clone(),
                config.request_timeout,
            )),
            config.cdn_url.clone(),
        );
        let timeout = config.request_timeout;
        let connect_host: HostConnector = Box::new(move |connection: &ServerConnection| {
            HostClient::connect(connection, HttpClient::clone(&http), timeout)
        });
        Self::with_parts(config, gallery, connect_host)
    }

    pub fn with_parts(
        config: EngineConfig,
        gallery: GalleryFetcher,
        connect_host: HostConnector,
    ) -> Self {
        Self {
            config,
            gallery,
            connect_host,
        }
    }

    /// Value for the response envelope's `Output` field.
    pub fn dispatch(&self, input: &PluginInput) -> PluginResult<Value> {
        let request = input.request()?;
        debug!(
            "{}: {}",
            describe(&request),
            Value::Object(input.args.clone())
        );

        match request {
            PluginRequest::GetGalleries {
                query,
                offset,
                aspect,
            } => {
                debug!("listing galleries for '{query}' from offset {offset}");
                Ok(json!({"images": self.gallery.list_placeholder(&query, aspect)}))
            }
            PluginRequest::GetSet { set_url, aspect } => {
                let result = self.gallery.fetch_gallery_set_or_empty(
                    &set_url,
                    aspect,
                    DEFAULT_SET_LIMIT,
                    0,
                );
                to_output(&result)
            }
            PluginRequest::SaveImage {
                id,
                target,
                img_src,
            } => {
                let host = self.host(input)?;
                host.save_cover(target, &id, &img_src)
            }
            PluginRequest::SetTags => self.set_tags(input, &mut crate::plugin_log::report_progress),
        }
    }

    /// Runs the tag autofill batch, reporting progress through `progress`.
    pub fn set_tags(
        &self,
        input: &PluginInput,
        progress: &mut dyn FnMut(f64),
    ) -> PluginResult<Value> {
        info!("Setting random image for blank tags");
        let host = self.host(input)?;
        let summary = TagAutofill::new(
            &host,
            &self.gallery,
            self.config.autofill_limit,
            self.config.tag_delay,
            rand::rng(),
        )
        .run(progress)?;
        to_output(&summary)
    }

    fn host(&self, input: &PluginInput) -> PluginResult<HostClient> {
        let connection = input.connection()?;
        Ok((self.connect_host)(connection))
    }
}

fn describe(request: &PluginRequest) -> &'static str {
    match request {
        PluginRequest::GetGalleries { .. } => "Getting galleries",
        PluginRequest::GetSet { .. } => "Getting set",
        PluginRequest::SaveImage { .. } => "Saving image",
        PluginRequest::SetTags => "Setting tags",
    }
}

fn to_output<T: serde::Serialize>(value: &T) -> PluginResult<Value> {
    serde_json::to_value(value)
        .map_err(|err| PluginError::parse(format!("failed to encode output: {err}")))
}
