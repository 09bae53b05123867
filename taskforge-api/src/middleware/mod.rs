/// Middleware modules for the API server
///
/// - `session`: session token extraction, cookies and the authentication layer

pub mod session;
