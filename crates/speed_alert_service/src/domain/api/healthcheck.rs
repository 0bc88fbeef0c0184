/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use actix_web::{
    get,
    web::{Data, Json},
};

use crate::{
    common::types::RouterState, domain::types::outbound::ResponseData, environment::AppState,
    tools::error::AppError,
};

#[get("/healthcheck")]
pub async fn health_check(data: Data<AppState>) -> Result<Json<ResponseData>, AppError> {
    let router_state = data.current_state();

    if router_state != RouterState::Routing {
        return Err(AppError::ServiceUnavailable(format!(
            "Health check failed as router is {router_state}"
        )));
    }

    Ok(Json(ResponseData {
        result: "Service Is Up".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App};
    use tokio::sync::watch;

    #[actix_web::test]
    async fn healthcheck_follows_router_state() {
        let (state_tx, state_rx) = watch::channel(RouterState::AwaitingConnection);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(state_rx)))
                .configure(crate::domain::api::handler),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/healthcheck").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        state_tx.send_replace(RouterState::Routing);
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/healthcheck").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
