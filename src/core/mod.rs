/// Permission gate for admin pages
pub mod access;
/// Pure dashboard computations over loaded submissions
pub mod aggregate;
/// Census form state, validation and submission
pub mod builder;
/// Typed census submission model
pub mod census;
/// Users, roles and the live directory view
pub mod directory;
/// Admin-defined dynamic field values
pub mod dynamic;
/// Form-builder schema documents
pub mod form_schema;
/// Change notification hub
pub mod live;
/// Local fallback copies of settings
pub mod local_cache;
/// Schools and professionals reference data
pub mod reference;
/// Home page settings and the keyed settings store
pub mod settings;
/// Submission reads and section status updates
pub mod submissions;
