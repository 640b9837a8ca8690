//! Hue CLIP v2 bridge adapter.
//!
//! Implements [`LightBridge`] over the bridge's HTTPS resource API:
//!
//! - `GET  clip/v2/resource/{kind}/{id}` reads on/dimming/colour state
//! - `PUT  clip/v2/resource/{kind}/{id}` starts or stops a transition, or
//!   writes attributes
//!
//! Every request carries the `hue-application-key` header. Bridges serve a
//! self-signed certificate, so certificate validation is disabled for this
//! client only. Responses use the `{"errors": [...], "data": [...]}` envelope;
//! a non-empty `errors` array is treated as a failure even on HTTP 200.

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use super::{
    AttributePayload, LightBridge, LightTarget, MirekSchema, ResourceKind, ResourceState,
    TransitionCommand,
};
use crate::constants::{APPLICATION_KEY_HEADER, CLIP_RESOURCE_PATH};

/// Blocking HTTP client for one Hue bridge.
pub struct ClipBridge {
    client: Client,
    base_url: String,
    application_key: String,
    debug_enabled: bool,
}

impl ClipBridge {
    /// Create a client for the bridge at `host`.
    ///
    /// `host` is normally a bare address (`192.168.1.2`); an explicit
    /// `http://` or `https://` prefix is kept as given.
    pub fn new(
        host: &str,
        application_key: &str,
        timeout: Duration,
        debug_enabled: bool,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .context("Failed to build HTTP client for the Hue bridge")?;

        Ok(Self {
            client,
            base_url: resource_base_url(host),
            application_key: application_key.to_string(),
            debug_enabled,
        })
    }

    fn resource_url(&self, kind: &str, id: &str) -> String {
        format!("{}/{kind}/{id}", self.base_url)
    }

    /// GET a resource and return the first entry of its `data` array.
    fn get_resource(&self, kind: &str, id: &str) -> Result<ResourceData> {
        let url = self.resource_url(kind, id);
        let response = self
            .client
            .get(&url)
            .header(APPLICATION_KEY_HEADER, &self.application_key)
            .send()
            .with_context(|| format!("GET {kind}/{id} failed"))?;

        let status = response.status();
        let body = response
            .text()
            .with_context(|| format!("Failed to read response body for {kind}/{id}"))?;

        if !status.is_success() {
            bail!("GET {kind}/{id} returned {status}: {}", error_summary(&body));
        }

        parse_resource(&body).with_context(|| format!("Unexpected response for {kind}/{id}"))
    }

    fn put_resource(&self, kind: &str, id: &str, body: &Value) -> Result<()> {
        if self.debug_enabled {
            log_debug!("PUT {kind}/{id} {body}");
        }

        let response = self
            .client
            .put(self.resource_url(kind, id))
            .header(APPLICATION_KEY_HEADER, &self.application_key)
            .json(body)
            .send()
            .with_context(|| format!("PUT {kind}/{id} failed"))?;

        let status = response.status();
        let text = response.text().unwrap_or_default();

        if !status.is_success() {
            bail!("PUT {kind}/{id} returned {status}: {}", error_summary(&text));
        }

        check_errors(&text).with_context(|| format!("Bridge rejected PUT {kind}/{id}"))
    }
}

impl LightBridge for ClipBridge {
    fn resource_state(&self, target: &LightTarget) -> Result<ResourceState> {
        Ok(self
            .get_resource(target.kind.as_str(), &target.id)?
            .into_state())
    }

    fn send_transition_command(
        &self,
        target: &LightTarget,
        command: &TransitionCommand,
    ) -> Result<()> {
        self.put_resource(
            target.kind.as_str(),
            &target.id,
            &transition_body(command),
        )
    }

    fn send_stop_command(&self, target: &LightTarget) -> Result<()> {
        self.put_resource(target.kind.as_str(), &target.id, &stop_body())
    }

    fn group_members(&self, group_id: &str) -> Result<Vec<String>> {
        let group = self.get_resource(ResourceKind::GroupedLight.as_str(), group_id)?;
        let Some(owner) = group.owner else {
            return Ok(Vec::new());
        };

        // Zones list lights directly, rooms list devices that own light services
        let owner = self.get_resource(&owner.rtype, &owner.rid)?;
        let mut light_ids = Vec::new();

        for child in &owner.children {
            match child.rtype.as_str() {
                "light" => light_ids.push(child.rid.clone()),
                "device" => {
                    let device = self.get_resource("device", &child.rid)?;
                    light_ids.extend(
                        device
                            .services
                            .into_iter()
                            .filter(|service| service.rtype == "light")
                            .map(|service| service.rid),
                    );
                }
                _ => {}
            }
        }

        Ok(light_ids)
    }

    fn apply_attributes(&self, light_id: &str, payload: &AttributePayload) -> Result<()> {
        self.put_resource(
            ResourceKind::Light.as_str(),
            light_id,
            &attribute_body(payload),
        )
    }
}

fn resource_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{host}/{CLIP_RESOURCE_PATH}")
    } else {
        format!("https://{host}/{CLIP_RESOURCE_PATH}")
    }
}

// # Wire format

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    errors: Vec<ClipError>,
    #[serde(default)]
    data: Vec<ResourceData>,
}

#[derive(Debug, Deserialize)]
struct ClipError {
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceData {
    on: Option<OnState>,
    dimming: Option<Dimming>,
    color_temperature: Option<ColorTemperature>,
    owner: Option<ResourceRef>,
    #[serde(default)]
    children: Vec<ResourceRef>,
    #[serde(default)]
    services: Vec<ResourceRef>,
}

#[derive(Debug, Deserialize)]
struct OnState {
    on: bool,
}

#[derive(Debug, Deserialize)]
struct Dimming {
    brightness: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ColorTemperature {
    mirek: Option<u32>,
    mirek_schema: Option<WireMirekSchema>,
}

#[derive(Debug, Deserialize)]
struct WireMirekSchema {
    mirek_minimum: u32,
    mirek_maximum: u32,
}

#[derive(Debug, Deserialize)]
struct ResourceRef {
    rid: String,
    rtype: String,
}

impl ResourceData {
    fn into_state(self) -> ResourceState {
        let supports_color_temperature = self.color_temperature.is_some();
        let (mirek, mirek_schema) = match self.color_temperature {
            Some(ct) => (
                ct.mirek,
                ct.mirek_schema.map(|schema| MirekSchema {
                    minimum: schema.mirek_minimum,
                    maximum: schema.mirek_maximum,
                }),
            ),
            None => (None, None),
        };

        ResourceState {
            on: self.on.is_some_and(|on| on.on),
            brightness: self.dimming.and_then(|dimming| dimming.brightness),
            mirek,
            mirek_schema,
            supports_color_temperature,
        }
    }
}

fn parse_resource(body: &str) -> Result<ResourceData> {
    let envelope: Envelope =
        serde_json::from_str(body).context("Failed to parse CLIP v2 response")?;

    if let Some(error) = envelope.errors.first() {
        bail!("{}", error.description);
    }

    envelope
        .data
        .into_iter()
        .next()
        .context("CLIP v2 response contained no data")
}

fn check_errors(body: &str) -> Result<()> {
    // An empty or non-JSON body on success carries no error list
    let Ok(envelope) = serde_json::from_str::<Envelope>(body) else {
        return Ok(());
    };
    if let Some(error) = envelope.errors.first() {
        bail!("{}", error.description);
    }
    Ok(())
}

fn error_summary(body: &str) -> String {
    serde_json::from_str::<Envelope>(body)
        .ok()
        .and_then(|envelope| envelope.errors.into_iter().next())
        .map(|error| error.description)
        .unwrap_or_else(|| body.trim().to_string())
}

fn transition_body(command: &TransitionCommand) -> Value {
    let mut body = json!({
        "dimming": { "brightness": command.brightness },
        "dynamics": { "duration": command.duration_ms },
    });
    if let Some(on) = command.on {
        body["on"] = json!({ "on": on });
    }
    body
}

fn stop_body() -> Value {
    json!({ "dimming_delta": { "action": "stop" } })
}

fn attribute_body(payload: &AttributePayload) -> Value {
    let mut body = json!({});
    if let Some(brightness) = payload.brightness {
        body["dimming"] = json!({ "brightness": brightness });
    }
    if let Some(mirek) = payload.mirek {
        body["color_temperature"] = json!({ "mirek": mirek });
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIGHT_RESPONSE: &str = r#"{
        "errors": [],
        "data": [{
            "id": "3f1c0c2e",
            "type": "light",
            "on": { "on": true },
            "dimming": { "brightness": 48.62, "min_dim_level": 0.2 },
            "color_temperature": {
                "mirek": 366,
                "mirek_valid": true,
                "mirek_schema": { "mirek_minimum": 153, "mirek_maximum": 454 }
            }
        }]
    }"#;

    #[test]
    fn test_parse_light_state() {
        let state = parse_resource(LIGHT_RESPONSE).unwrap().into_state();
        assert!(state.on);
        assert_eq!(state.brightness, Some(48.62));
        assert_eq!(state.mirek, Some(366));
        assert_eq!(
            state.mirek_schema,
            Some(MirekSchema {
                minimum: 153,
                maximum: 454
            })
        );
        assert!(state.supports_color_temperature);
        assert_eq!(state.reported_brightness(), 48.62);
    }

    #[test]
    fn test_parse_off_light_without_color_temperature() {
        let body = r#"{"errors":[],"data":[{"on":{"on":false},"dimming":{"brightness":30.0}}]}"#;
        let state = parse_resource(body).unwrap().into_state();
        assert!(!state.on);
        assert_eq!(state.brightness, Some(30.0));
        assert_eq!(state.reported_brightness(), 0.0);
        assert!(!state.supports_color_temperature);
        assert_eq!(state.color_temp_kelvin(), None);
    }

    #[test]
    fn test_parse_errors_envelope() {
        let body = r#"{"errors":[{"description":"resource not found"}],"data":[]}"#;
        let err = parse_resource(body).unwrap_err();
        assert!(err.to_string().contains("resource not found"));
    }

    #[test]
    fn test_parse_empty_data() {
        let err = parse_resource(r#"{"errors":[],"data":[]}"#).unwrap_err();
        assert!(err.to_string().contains("no data"));
    }

    #[test]
    fn test_parse_group_owner_and_children() {
        let group = r#"{"data":[{"owner":{"rid":"room-1","rtype":"room"},"on":{"on":true}}]}"#;
        let data = parse_resource(group).unwrap();
        let owner = data.owner.unwrap();
        assert_eq!(owner.rid, "room-1");
        assert_eq!(owner.rtype, "room");

        let room = r#"{"data":[{"children":[
            {"rid":"dev-1","rtype":"device"},
            {"rid":"light-9","rtype":"light"}
        ]}]}"#;
        let data = parse_resource(room).unwrap();
        assert_eq!(data.children.len(), 2);
        assert_eq!(data.children[1].rid, "light-9");
    }

    #[test]
    fn test_transition_body_raise() {
        let body = transition_body(&TransitionCommand {
            brightness: 100.0,
            duration_ms: 2500,
            on: Some(true),
        });
        assert_eq!(
            body,
            json!({
                "dimming": { "brightness": 100.0 },
                "dynamics": { "duration": 2500 },
                "on": { "on": true }
            })
        );
    }

    #[test]
    fn test_transition_body_without_on() {
        let body = transition_body(&TransitionCommand {
            brightness: 40.0,
            duration_ms: 1200,
            on: None,
        });
        assert!(body.get("on").is_none());
    }

    #[test]
    fn test_stop_body() {
        assert_eq!(stop_body()["dimming_delta"]["action"], "stop");
    }

    #[test]
    fn test_attribute_body() {
        let body = attribute_body(&AttributePayload {
            brightness: Some(42.5),
            mirek: Some(333),
        });
        assert_eq!(body["dimming"]["brightness"], 42.5);
        assert_eq!(body["color_temperature"]["mirek"], 333);

        let body = attribute_body(&AttributePayload {
            brightness: None,
            mirek: Some(250),
        });
        assert!(body.get("dimming").is_none());
    }

    #[test]
    fn test_resource_base_url() {
        assert_eq!(
            resource_base_url("192.168.1.2"),
            "https://192.168.1.2/clip/v2/resource"
        );
        assert_eq!(
            resource_base_url("http://localhost:8080/"),
            "http://localhost:8080/clip/v2/resource"
        );
    }

    #[test]
    fn test_error_summary_falls_back_to_body() {
        assert_eq!(error_summary("  unauthorized user "), "unauthorized user");
        assert_eq!(
            error_summary(r#"{"errors":[{"description":"invalid key"}]}"#),
            "invalid key"
        );
    }

    #[test]
    fn test_check_errors_accepts_success_envelope() {
        assert!(check_errors(r#"{"errors":[],"data":[{"rid":"a","rtype":"light"}]}"#).is_ok());
        assert!(check_errors("").is_ok());
        assert!(check_errors(r#"{"errors":[{"description":"busy"}]}"#).is_err());
    }
}
