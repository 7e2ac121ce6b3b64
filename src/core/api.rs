use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::post,
    Json, Router,
};
use log::debug;

use super::{
    error::DriverResult,
    msg::{
        Activation, Capabilities, CreateEndpointRequest, CreateEndpointResponse,
        CreateNetworkRequest, Empty, EndpointOperInfo, EndpointRequest, JoinInfo, NetworkRequest,
        Payload,
    },
    network::Driver,
};

/// Routes of the remote network driver protocol.
pub fn router(driver: Arc<Driver>) -> Router {
    Router::new()
        .route("/Plugin.Activate", post(activate))
        .route("/NetworkDriver.GetCapabilities", post(get_capabilities))
        .route("/NetworkDriver.CreateNetwork", post(create_network))
        .route("/NetworkDriver.DeleteNetwork", post(delete_network))
        .route("/NetworkDriver.CreateEndpoint", post(create_endpoint))
        .route("/NetworkDriver.EndpointOperInfo", post(endpoint_info))
        .route("/NetworkDriver.DeleteEndpoint", post(delete_endpoint))
        .route("/NetworkDriver.Join", post(join))
        .route("/NetworkDriver.Leave", post(leave))
        .route("/NetworkDriver.AllocateNetwork", post(no_op))
        .route("/NetworkDriver.FreeNetwork", post(no_op))
        .route("/NetworkDriver.ProgramExternalConnectivity", post(no_op))
        .route("/NetworkDriver.RevokeExternalConnectivity", post(no_op))
        .route("/NetworkDriver.DiscoverNew", post(no_op))
        .route("/NetworkDriver.DiscoverDelete", post(no_op))
        .layer(middleware::from_fn(access_log))
        .with_state(driver)
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();

    let resp = next.run(req).await;
    debug!("{method} {uri} -> {}", resp.status());

    resp
}

async fn activate() -> Json<Activation> {
    Json(Activation {
        implements: vec!["NetworkDriver".to_string()],
    })
}

async fn get_capabilities() -> Json<Capabilities> {
    Json(Capabilities {
        scope: "local".to_string(),
        connectivity_scope: "global".to_string(),
    })
}

async fn no_op() -> Json<Empty> {
    Json(Empty {})
}

async fn create_network(
    State(driver): State<Arc<Driver>>,
    Payload(req): Payload<CreateNetworkRequest>,
) -> DriverResult<Json<Empty>> {
    driver.create_network(&req).await?;
    Ok(Json(Empty {}))
}

async fn delete_network(
    State(driver): State<Arc<Driver>>,
    Payload(req): Payload<NetworkRequest>,
) -> DriverResult<Json<Empty>> {
    driver.delete_network(&req.network_id).await?;
    Ok(Json(Empty {}))
}

async fn create_endpoint(
    State(driver): State<Arc<Driver>>,
    Payload(req): Payload<CreateEndpointRequest>,
) -> DriverResult<Json<CreateEndpointResponse>> {
    let iface = req.interface.unwrap_or_default();
    let interface = driver
        .create_endpoint(&req.network_id, &req.endpoint_id, &iface)
        .await?;

    Ok(Json(CreateEndpointResponse { interface }))
}

async fn endpoint_info(
    State(driver): State<Arc<Driver>>,
    Payload(req): Payload<EndpointRequest>,
) -> DriverResult<Json<EndpointOperInfo>> {
    let info = driver
        .endpoint_info(&req.network_id, &req.endpoint_id)
        .await?;
    Ok(Json(info))
}

async fn delete_endpoint(
    State(driver): State<Arc<Driver>>,
    Payload(req): Payload<EndpointRequest>,
) -> DriverResult<Json<Empty>> {
    driver
        .delete_endpoint(&req.network_id, &req.endpoint_id)
        .await?;
    Ok(Json(Empty {}))
}

async fn join(
    State(driver): State<Arc<Driver>>,
    Payload(req): Payload<EndpointRequest>,
) -> DriverResult<Json<JoinInfo>> {
    let info = driver.join(&req.network_id, &req.endpoint_id).await?;
    Ok(Json(info))
}

async fn leave(
    State(driver): State<Arc<Driver>>,
    Payload(req): Payload<EndpointRequest>,
) -> DriverResult<Json<Empty>> {
    driver.leave(&req.network_id, &req.endpoint_id).await?;
    Ok(Json(Empty {}))
}
