mod events;

pub use events::EventDao;

// Boxed parameter vec for queries assembled from optional predicates.
pub type PgSendParam = dyn tokio_postgres::types::ToSql + Sync + Send;
pub type PgParamBox = Box<PgSendParam>;
pub type PgParamVec = Vec<PgParamBox>;
