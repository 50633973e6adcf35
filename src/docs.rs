use utoipa::OpenApi;

use crate::{handlers, models};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_devices,
        handlers::get_device,
        handlers::toggle_device,
        handlers::batch_toggle,
    ),
    components(
        schemas(
            models::Device,
            models::BatchToggleRequest,
            models::BatchToggleResult,
        )
    )
)]
pub struct ApiDoc;
