// sentinel-api: Async clients for the camera MJPEG stream and the PostgREST record store

pub mod camera;
pub mod error;
pub mod store;
pub mod transport;

pub use camera::{CameraClient, CameraStream};
pub use error::Error;
pub use store::StoreClient;
pub use transport::TransportConfig;
