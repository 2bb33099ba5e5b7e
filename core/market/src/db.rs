use agora_persistence::executor::DbExecutor;

pub mod dao;
pub mod model;
pub(crate) mod schema;

pub(crate) mod migrations {
    #[derive(diesel_migrations::EmbedMigrations)]
    struct _Dummy;
}

pub fn init(db: &DbExecutor) -> anyhow::Result<()> {
    db.apply_migration(migrations::run_with_output)
}
