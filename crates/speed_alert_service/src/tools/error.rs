/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use actix_web::{
    http::{header::ContentType, StatusCode},
    HttpResponse, ResponseError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    error_message: String,
    pub error_code: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
    #[error("Decode Error : {0}")]
    DecodeError(String),
    #[error("Validation Error : {0}")]
    ValidationError(String),
    #[error("Invalid Control Input : {0}")]
    InvalidControlInput(String),
    #[error("Publish Error : {0}")]
    PublishError(String),
    #[error("Subscribe Error : {0}")]
    SubscribeError(String),
    #[error("Connection Error : {0}")]
    ConnectionError(String),
    #[error("Hits Limit Exceeded : {0}")]
    HitsLimitExceeded(String),
    #[error("Invalid Configuration : {0}")]
    InvalidConfiguration(String),
    #[error("Internal Error : {0}")]
    InternalError(String),
    #[error("Panic Occured : {0}")]
    PanicOccured(String),
    #[error("Service Unavailable : {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    fn error_message(&self) -> ErrorBody {
        ErrorBody {
            error_message: self.message(),
            error_code: self.code(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            AppError::DecodeError(err)
            | AppError::ValidationError(err)
            | AppError::InternalError(err)
            | AppError::ServiceUnavailable(err) => err.to_string(),
            AppError::InvalidControlInput(input) => {
                format!("Expected true or false, received : {input}")
            }
            AppError::PublishError(reason) => format!("Bus Publish Failed : {reason}"),
            AppError::SubscribeError(reason) => format!("Bus Subscribe Failed : {reason}"),
            AppError::ConnectionError(reason) => format!("Bus Connection Failed : {reason}"),
            AppError::HitsLimitExceeded(key) => format!("Alert limit exceeded for : {key}"),
            AppError::PanicOccured(reason) => format!("Panic occured : {reason}"),
            _ => "Some Error Occured".to_string(),
        }
    }

    pub fn code(&self) -> String {
        match self {
            AppError::DecodeError(_) => "DECODE_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InvalidControlInput(_) => "INVALID_CONTROL_INPUT",
            AppError::PublishError(_) => "PUBLISH_FAILED",
            AppError::SubscribeError(_) => "SUBSCRIBE_FAILED",
            AppError::ConnectionError(_) => "CONNECTION_FAILED",
            AppError::HitsLimitExceeded(_) => "HITS_LIMIT_EXCEED",
            AppError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            AppError::InternalError(_) => "INTERNAL_ERROR",
            AppError::PanicOccured(_) => "PANIC_OCCURED",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
        .to_string()
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(self.error_message())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DecodeError(_) => StatusCode::BAD_REQUEST,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidControlInput(_) => StatusCode::BAD_REQUEST,
            AppError::HitsLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::PublishError(_)
            | AppError::SubscribeError(_)
            | AppError::ConnectionError(_)
            | AppError::InvalidConfiguration(_)
            | AppError::InternalError(_)
            | AppError::PanicOccured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
