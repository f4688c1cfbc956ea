pub mod assets;
pub mod background;
pub mod delivery;
pub mod fit;
pub mod fonts;
pub mod handler;
pub mod layout;
pub mod lines;
pub mod palette;
pub mod renderer;
pub mod scene;
mod service;
mod types;

pub use handler::create_poster_router;
pub use service::PosterService;
pub use types::{
    Backend, CONTENT_TYPE_PNG, CONTENT_TYPE_SVG, Delivery, GenerateRequest, GenerateResponse,
    Layout, RenderedImage, StatusResponse,
};
