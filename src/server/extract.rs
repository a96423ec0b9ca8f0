//! Request body extraction for the create endpoint.
//!
//! The endpoint accepts the same three fields in any of three encodings:
//!
//! | Content-Type                        | Extractor   |
//! |-------------------------------------|-------------|
//! | `application/json`                  | `Json`      |
//! | `application/x-www-form-urlencoded` | `Form`      |
//! | `multipart/form-data`               | `Multipart` |
//!
//! Validation of the field values happens in [`SplitBody::into_request`], so
//! every encoding reports the same errors.

use axum::extract::{FromRequest, Multipart, Request};
use axum::{Form, Json};
use http::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::error::{SplitError, ValidationError};
use crate::service::SplitRequest;
use crate::store::Retention;
use crate::tile::GridSpec;

/// `expiresInDays` as sent by the client: JSON clients may send a number,
/// form clients always send text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExpiresInDays {
    Number(f64),
    Text(String),
}

impl ExpiresInDays {
    fn to_retention(&self) -> Result<Retention, ValidationError> {
        match self {
            ExpiresInDays::Number(days) => Retention::from_days(*days),
            ExpiresInDays::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(Retention::default());
                }
                let days: f64 = text.parse().map_err(|_| ValidationError::InvalidExpiry {
                    value: text.to_string(),
                })?;
                Retention::from_days(days)
            }
        }
    }
}

/// Raw fields of a create request, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitBody {
    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default)]
    pub grid: Option<String>,

    #[serde(default)]
    pub expires_in_days: Option<ExpiresInDays>,
}

impl SplitBody {
    /// Validate the fields into a [`SplitRequest`].
    ///
    /// A missing or blank `expiresInDays` means one day. Zero is kept as
    /// zero, so those tiles expire at the next sweep.
    pub fn into_request(self) -> Result<SplitRequest, ValidationError> {
        let image_url = self
            .image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or(ValidationError::MissingImageUrl)?;

        let grid = GridSpec::parse(self.grid.as_deref().unwrap_or_default())?;

        let retention = match &self.expires_in_days {
            Some(value) => value.to_retention()?,
            None => Retention::default(),
        };

        Ok(SplitRequest {
            image_url,
            grid,
            retention,
        })
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ValidationError> {
        let mut body = SplitBody::default();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "imageUrl" => body.image_url = Some(field.text().await.map_err(malformed)?),
                "grid" => body.grid = Some(field.text().await.map_err(malformed)?),
                "expiresInDays" => {
                    body.expires_in_days =
                        Some(ExpiresInDays::Text(field.text().await.map_err(malformed)?))
                }
                // Unknown fields, including uploaded files, are ignored
                _ => {}
            }
        }

        Ok(body)
    }
}

fn malformed(err: impl std::fmt::Display) -> ValidationError {
    ValidationError::MalformedBody {
        message: err.to_string(),
    }
}

/// Media type of the request without parameters, lower-cased.
fn media_type(req: &Request) -> Option<String> {
    let value = req.headers().get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = value.split(';').next().unwrap_or_default().trim();
    Some(essence.to_ascii_lowercase())
}

impl<S> FromRequest<S> for SplitBody
where
    S: Send + Sync,
{
    type Rejection = SplitError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = match media_type(&req).as_deref() {
            Some("application/json") => Json::<SplitBody>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .map_err(|rejection| malformed(rejection.body_text()))?,
            Some("application/x-www-form-urlencoded") => {
                Form::<SplitBody>::from_request(req, state)
                    .await
                    .map(|Form(body)| body)
                    .map_err(|rejection| malformed(rejection.body_text()))?
            }
            Some("multipart/form-data") => {
                let multipart = Multipart::from_request(req, state)
                    .await
                    .map_err(|rejection| malformed(rejection.body_text()))?;
                SplitBody::from_multipart(multipart).await?
            }
            Some(other) => {
                return Err(malformed(format!("unsupported content type {:?}", other)).into())
            }
            None => return Err(malformed("missing Content-Type header").into()),
        };

        Ok(body)
    }
}
