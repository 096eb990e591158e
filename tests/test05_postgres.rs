#![cfg(feature = "postgres")]

//! Runs against a live server named by `SQL_MUTATION_PG_URL`; skipped when it is unset.

use std::error::Error;

use sql_mutation::prelude::*;
use tokio::runtime::Runtime;

const PG_URL: &str = "SQL_MUTATION_PG_URL";

async fn connect() -> Result<Option<ConfigAndPool>, Box<dyn Error>> {
    let Ok(url) = std::env::var(PG_URL) else {
        eprintln!("{PG_URL} not set; skipping postgres test");
        return Ok(None);
    };
    let db = ConfigAndPool::postgres_builder()
        .url(url)
        .max_size(4)
        .build()
        .await?;
    Ok(Some(db))
}

async fn fresh_table(db: &ConfigAndPool, table: &str) -> Result<(), Box<dyn Error>> {
    let link = db.master_link().await?;
    link.exec(&format!("DROP TABLE IF EXISTS {table}"), &[])
        .await?;
    link.exec(
        &format!(
            "CREATE TABLE {table} (
                id BIGSERIAL PRIMARY KEY,
                sku TEXT NOT NULL UNIQUE,
                qty INTEGER NOT NULL,
                price DOUBLE PRECISION,
                active BOOLEAN NOT NULL DEFAULT TRUE
            )"
        ),
        &[],
    )
    .await?;
    Ok(())
}

async fn drop_table(db: &ConfigAndPool, table: &str) -> Result<(), Box<dyn Error>> {
    db.master_link()
        .await?
        .exec(&format!("DROP TABLE IF EXISTS {table}"), &[])
        .await?;
    Ok(())
}

#[test]
fn returning_round_trip_on_postgres() -> Result<(), Box<dyn Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let Some(db) = connect().await? else {
            return Ok(());
        };
        let table = format!("mutation_stock_{}", std::process::id());
        fresh_table(&db, &table).await?;
        let ctx = CallContext::new();

        let inserted = db
            .insert(table.as_str())
            .columns(["sku", "qty", "price"])
            .rows([
                vec!["A-1".into(), 5.into(), 9.5.into()],
                vec!["B-2".into(), 7.into(), RowValues::Null],
            ])
            .returning(["id", "sku"])
            .execute(&ctx)
            .await?;
        let records = inserted.records().ok_or("records missing")?;
        let skus: Vec<&str> = records.iter().filter_map(|r| r["sku"].as_text()).collect();
        assert_eq!(skus, ["A-1", "B-2"]);
        assert!(inserted.last_insert_id().unwrap_err().is_not_supported());

        // BIGSERIAL key is found through the catalog
        let plain = db
            .insert(table.as_str())
            .columns(["sku", "qty"])
            .values(vec!["C-3".into(), 1.into()])
            .execute(&ctx)
            .await?;
        assert!(!plain.has_records());
        assert_eq!(plain.last_insert_id()?, 3);

        let updated = db
            .update(table.as_str())
            .set_expr("qty", "qty + $1", vec![RowValues::Int(10)])
            .where_eq("sku", "A-1")
            .returning_all()
            .execute(&ctx)
            .await?;
        let row = &updated.records().ok_or("records missing")?[0];
        assert_eq!(row["qty"], RowValues::Int(15));
        assert_eq!(row["active"], RowValues::Bool(true));

        let supports_old_new = matches!(
            db.cached_server_version(),
            Some(Some(version)) if version >= ServerVersion::new(18, 0, 0)
        );
        let old_new = db
            .update(table.as_str())
            .set("qty", 0)
            .where_eq("sku", "B-2")
            .returning(["OLD.qty", "NEW.qty"])
            .execute(&ctx)
            .await;
        if supports_old_new {
            assert_eq!(old_new?.rows_affected(), 1);
        } else {
            assert!(old_new.unwrap_err().is_not_supported());
        }

        let deleted = db
            .delete(table.as_str())
            .filter(Filter::is_in("sku", ["A-1", "C-3"]))
            .execute(&ctx)
            .await?;
        assert_eq!(deleted.rows_affected(), 2);

        drop_table(&db, &table).await?;
        Ok::<(), Box<dyn Error>>(())
    })
}

#[test]
fn numeric_and_uuid_columns_come_back_as_text() -> Result<(), Box<dyn Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let Some(db) = connect().await? else {
            return Ok(());
        };
        let table = format!("mutation_priced_{}", std::process::id());
        let link = db.master_link().await?;
        link.exec(&format!("DROP TABLE IF EXISTS {table}"), &[])
            .await?;
        link.exec(
            &format!(
                "CREATE TABLE {table} (
                    id BIGSERIAL PRIMARY KEY,
                    sku TEXT NOT NULL,
                    price NUMERIC(10, 2) NOT NULL DEFAULT 12.50,
                    code UUID NOT NULL DEFAULT '6f1c2a4e-0001-4b2c-9d3e-112233445566',
                    window_open INTERVAL NOT NULL DEFAULT '1 day'
                )"
            ),
            &[],
        )
        .await?;

        let inserted = db
            .insert(table.as_str())
            .columns(["sku"])
            .values(vec!["N-1".into()])
            .returning_all()
            .execute(&CallContext::new())
            .await?;
        let row = &inserted.records().ok_or("records missing")?[0];
        assert_eq!(row["price"], RowValues::Text("12.50".into()));
        assert_eq!(
            row["code"],
            RowValues::Text("6f1c2a4e-0001-4b2c-9d3e-112233445566".into())
        );
        assert!(row["window_open"].as_blob().is_some());

        drop_table(&db, &table).await?;
        Ok::<(), Box<dyn Error>>(())
    })
}

#[test]
fn postgres_transactions_commit_and_roll_back() -> Result<(), Box<dyn Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let Some(db) = connect().await? else {
            return Ok(());
        };
        let table = format!("mutation_tx_{}", std::process::id());
        fresh_table(&db, &table).await?;

        let tx = db.begin().await?;
        let ctx = CallContext::new().with_transaction(tx.link());
        db.insert(table.as_str())
            .columns(["sku", "qty"])
            .values(vec!["T-1".into(), 1.into()])
            .execute(&ctx)
            .await?;
        tx.rollback().await?;

        let tx = db.begin().await?;
        let ctx = CallContext::new().with_transaction(tx.link());
        db.insert(table.as_str())
            .columns(["sku", "qty"])
            .values(vec!["T-2".into(), 2.into()])
            .execute(&ctx)
            .await?;
        tx.commit().await?;

        let remaining = db
            .delete(table.as_str())
            .filter(Filter::raw("qty >= $1", vec![RowValues::Int(0)]))
            .returning(["sku"])
            .execute(&CallContext::new())
            .await?;
        let skus: Vec<&str> = remaining
            .records()
            .ok_or("records missing")?
            .iter()
            .filter_map(|r| r["sku"].as_text())
            .collect();
        assert_eq!(skus, ["T-2"]);

        drop_table(&db, &table).await?;
        Ok::<(), Box<dyn Error>>(())
    })
}
