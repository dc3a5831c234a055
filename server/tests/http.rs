//! Smoke test against a live Postgres database. Runs only when
//! `PEREVAL_TEST_DB_CONNECTION_STRING` points at a database with the
//! migrations applied; otherwise it skips itself.

use std::env;

use serde_json::{json, Value};

use pereval_backend::db::{Db, PgDb};
use pereval_backend::submission::{SubmissionPayload, UpdateOutcome};

fn payload(email: &str, title: &str) -> SubmissionPayload {
    serde_json::from_value(json!({
        "user": {
            "email": email,
            "fam": "Пупкин",
            "name": "Василий",
            "otc": "Иванович",
            "phone": "+79031234567"
        },
        "coords": { "latitude": 45.3842, "longitude": 7.1525, "height": 1200 },
        "level": { "winter": "", "summer": "1А", "autumn": "1А", "spring": "" },
        "images": [
            { "data": "aGVsbG8=", "title": "Седловина" },
            { "data": "d29ybGQ=", "title": "Подъём" }
        ],
        "beautyTitle": "пер. ",
        "title": title,
        "other_titles": "Триев",
        "connect": ""
    }))
    .expect("deserialize payload")
}

#[tokio::test]
async fn postgres_round_trip() {
    dotenv::dotenv().ok();

    let connection_string = match env::var("PEREVAL_TEST_DB_CONNECTION_STRING") {
        Ok(s) => s,
        Err(_) => {
            eprintln!("skipping: PEREVAL_TEST_DB_CONNECTION_STRING is not set");
            return;
        }
    };

    let pool = sqlx::PgPool::connect(&connection_string)
        .await
        .expect("connect to test database");
    let db = PgDb::new(pool.clone());

    // unique email per run so the submitter-reuse check is meaningful
    let email = format!(
        "smoke-{}@example.com",
        chrono::Utc::now().timestamp_micros()
    );

    let first = db
        .create_submission(payload(&email, "Пхия"))
        .await
        .expect("create first submission");
    let second = db
        .create_submission(payload(&email, "Сиркельское"))
        .await
        .expect("create second submission");

    let view = db
        .retrieve_submission(first)
        .await
        .expect("retrieve submission")
        .expect("submission exists");
    let view = serde_json::to_value(&view).expect("serialize view");

    assert_eq!(view["status"], "new");
    assert_eq!(view["title"], "Пхия");
    assert_eq!(view["user"]["email"], Value::from(email.clone()));
    assert_eq!(view["images"][0]["title"], "Седловина");
    assert_eq!(view["images"][1]["title"], "Подъём");

    // both submissions share one submitter row
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&pool)
        .await
        .expect("count submitters");
    assert_eq!(count, 1);

    let summaries = db
        .list_by_submitter_email(email.clone())
        .await
        .expect("list submissions");
    let summaries = serde_json::to_value(&summaries).expect("serialize summaries");

    assert_eq!(summaries[0]["id"], second);
    assert_eq!(summaries[1]["id"], first);

    let outcome = db
        .update_submission(first, payload(&email, "Пхия Северная"))
        .await
        .expect("update new submission");
    assert_eq!(outcome, UpdateOutcome::Updated);

    sqlx::query("UPDATE pereval_added SET status = 'pending' WHERE id = $1")
        .bind(first)
        .execute(&pool)
        .await
        .expect("mark submission pending");

    let outcome = db
        .update_submission(first, payload(&email, "Пхия Южная"))
        .await
        .expect("attempt update of pending submission");
    assert!(matches!(outcome, UpdateOutcome::NotEditable { .. }));

    let view = db
        .retrieve_submission(first)
        .await
        .expect("retrieve submission")
        .expect("submission exists");
    let view = serde_json::to_value(&view).expect("serialize view");
    assert_eq!(view["title"], "Пхия Северная");

    let missing = db
        .retrieve_submission(-1)
        .await
        .expect("retrieve unknown id");
    assert!(missing.is_none());
}
