//! Migrating twice must be a no-op the second time.
//!
//! DB-backed test, skipped if SLP_DATABASE_URL is not set.
#[tokio::test]
async fn migrate_idempotent_on_clean_db() -> anyhow::Result<()> {
    let url = match std::env::var(slp_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: SLP_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = slp_db::connect(&url).await?;

    slp_db::migrate(&pool).await?;
    slp_db::migrate(&pool).await?;

    let st = slp_db::status(&pool).await?;
    assert!(st.ok);
    assert!(st.has_notes_table);

    Ok(())
}
