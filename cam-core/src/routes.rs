/// Command server route table
///
/// The HTTP server registers a single catch-all handler; every request is
/// resolved here against an explicit `(path, Route)` table.

pub const FLASH_ON_BODY: &str = "Flash ON";
pub const FLASH_OFF_BODY: &str = "Flash OFF";
pub const NOT_FOUND_BODY: &str = "Not Found";

pub const TEXT_PLAIN: &str = "text/plain";
pub const IMAGE_JPEG: &str = "image/jpeg";
pub const SNAPSHOT_DISPOSITION: &str = "inline; filename=capture.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    FlashOn,
    FlashOff,
    Snapshot,
    MjpegStream,
}

pub const ROUTE_TABLE: [(&str, Route); 4] = [
    ("/flash_on", Route::FlashOn),
    ("/flash_off", Route::FlashOff),
    ("/jpg", Route::Snapshot),
    ("/", Route::MjpegStream),
];

impl Route {
    pub fn path(self) -> &'static str {
        ROUTE_TABLE
            .iter()
            .find(|(_, route)| *route == self)
            .map(|(path, _)| *path)
            .unwrap_or("/")
    }

    /// Match a request line. Only GET is routed; the query string is ignored.
    pub fn resolve(method: Method, uri: &str) -> Option<Route> {
        if method != Method::Get {
            return None;
        }
        let path = uri.split_once('?').map_or(uri, |(path, _)| path);
        ROUTE_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == path)
            .map(|(_, route)| *route)
    }
}
