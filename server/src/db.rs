use futures::future::BoxFuture;

use crate::errors::BackendError;
use crate::submission::{SubmissionPayload, SubmissionSummary, SubmissionView, UpdateOutcome};

/// The injected store capability. Every method runs as one atomic
/// unit of work: either all of its reads and writes commit together
/// or none do.
pub trait Db {
    /// Resolves or creates the submitter, stores the coordinates, the
    /// submission itself (with status forced to `new`) and its images,
    /// and returns the generated submission ID.
    fn create_submission(&self, payload: SubmissionPayload)
        -> BoxFuture<Result<i32, BackendError>>;

    /// Returns the denormalized view of a submission, or `None` if no
    /// submission with the given ID exists.
    fn retrieve_submission(
        &self,
        id: i32,
    ) -> BoxFuture<Result<Option<SubmissionView>, BackendError>>;

    /// Applies the status-gated update: while the submission is still
    /// `new`, overwrites its coordinates in place, its title and level
    /// fields, and replaces the entire image set. The submitter block
    /// of the payload is ignored; identity is keyed on email at
    /// creation time only.
    fn update_submission(
        &self,
        id: i32,
        payload: SubmissionPayload,
    ) -> BoxFuture<Result<UpdateOutcome, BackendError>>;

    /// Lists a submitter's submissions, newest first. Unknown emails
    /// produce an empty list, not an error.
    fn list_by_submitter_email(
        &self,
        email: String,
    ) -> BoxFuture<Result<Vec<SubmissionSummary>, BackendError>>;
}

pub mod memory;

pub use self::postgres::*;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::postgres::{PgPool, PgRow};
    use sqlx::{Postgres, Transaction};

    use crate::errors::BackendError;
    use crate::submission::{
        Status, SubmissionPayload, SubmissionSummary, SubmissionView, UpdateOutcome,
    };

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn create_submission(
            &self,
            payload: SubmissionPayload,
        ) -> BoxFuture<Result<i32, BackendError>> {
            async move {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                let user_id = submitters::resolve_or_create(&mut tx, &payload).await?;
                let coords_id = geo::create(&mut tx, &payload).await?;
                let id = submissions::create(&mut tx, user_id, coords_id, &payload).await?;
                images::replace_all(&mut tx, id, &payload).await?;

                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(id)
            }
            .boxed()
        }

        fn retrieve_submission(
            &self,
            id: i32,
        ) -> BoxFuture<Result<Option<SubmissionView>, BackendError>> {
            async move {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                let view = match submissions::full_view(&mut tx, id).await? {
                    Some((submission, status)) => {
                        let images = images::for_submission(&mut tx, id).await?;

                        Some(SubmissionView {
                            submission: SubmissionPayload {
                                images,
                                ..submission
                            },
                            status,
                        })
                    }
                    None => None,
                };

                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(view)
            }
            .boxed()
        }

        fn update_submission(
            &self,
            id: i32,
            payload: SubmissionPayload,
        ) -> BoxFuture<Result<UpdateOutcome, BackendError>> {
            async move {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                let (status, coords_id) = match submissions::status_and_coords(&mut tx, id).await?
                {
                    Some(current) => current,
                    None => return Ok(UpdateOutcome::NotFound),
                };

                if status != Status::New {
                    return Ok(UpdateOutcome::NotEditable { status });
                }

                geo::replace(&mut tx, coords_id, &payload).await?;
                submissions::update_fields(&mut tx, id, &payload).await?;
                images::replace_all(&mut tx, id, &payload).await?;

                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(UpdateOutcome::Updated)
            }
            .boxed()
        }

        fn list_by_submitter_email(
            &self,
            email: String,
        ) -> BoxFuture<Result<Vec<SubmissionSummary>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/list_submissions.sql"));

                let summaries = query
                    .bind(email)
                    .try_map(|row: PgRow| {
                        Ok(SubmissionSummary {
                            id: try_get(&row, "id")?,
                            status: try_get_status(&row)?,
                            title: try_get(&row, "title")?,
                            beauty_title: try_get(&row, "beauty_title")?,
                            date_added: try_get(&row, "add_time")?,
                        })
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(summaries)
            }
            .boxed()
        }
    }

    /// The submitter registry. Identity is keyed solely on email; a
    /// reused email returns the existing row untouched, whatever
    /// name or phone the payload carried.
    mod submitters {
        use super::*;

        pub(super) async fn resolve_or_create(
            tx: &mut Transaction<'_, Postgres>,
            payload: &SubmissionPayload,
        ) -> Result<i32, BackendError> {
            let submitter = &payload.user;

            let existing: Option<(i32,)> =
                sqlx::query_as(include_str!("queries/find_submitter.sql"))
                    .bind(&submitter.email)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;

            if let Some((id,)) = existing {
                return Ok(id);
            }

            // ON CONFLICT DO NOTHING: the unique constraint on email is
            // the actual race-safety mechanism, the lookup above only an
            // optimization
            let inserted: Option<(i32,)> =
                sqlx::query_as(include_str!("queries/create_submitter.sql"))
                    .bind(&submitter.email)
                    .bind(&submitter.fam)
                    .bind(&submitter.name)
                    .bind(&submitter.otc)
                    .bind(&submitter.phone)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;

            match inserted {
                Some((id,)) => Ok(id),
                // lost the insert race; the row is visible now
                None => {
                    let (id,): (i32,) =
                        sqlx::query_as(include_str!("queries/find_submitter.sql"))
                            .bind(&submitter.email)
                            .fetch_one(&mut *tx)
                            .await
                            .map_err(map_sqlx_error)?;

                    Ok(id)
                }
            }
        }
    }

    /// The geolocation record store. Each coordinate row is the 1:1
    /// owned child of exactly one submission: created with it, mutated
    /// in place on update, never shared.
    mod geo {
        use super::*;

        pub(super) async fn create(
            tx: &mut Transaction<'_, Postgres>,
            payload: &SubmissionPayload,
        ) -> Result<i32, BackendError> {
            let coords = &payload.coords;

            let (id,): (i32,) = sqlx::query_as(include_str!("queries/create_coords.sql"))
                .bind(coords.latitude)
                .bind(coords.longitude)
                .bind(coords.height)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

            Ok(id)
        }

        pub(super) async fn replace(
            tx: &mut Transaction<'_, Postgres>,
            coords_id: i32,
            payload: &SubmissionPayload,
        ) -> Result<(), BackendError> {
            let coords = &payload.coords;

            sqlx::query(include_str!("queries/update_coords.sql"))
                .bind(coords_id)
                .bind(coords.latitude)
                .bind(coords.longitude)
                .bind(coords.height)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

            Ok(())
        }
    }

    /// The submission store proper.
    mod submissions {
        use super::*;

        pub(super) async fn create(
            tx: &mut Transaction<'_, Postgres>,
            user_id: i32,
            coords_id: i32,
            payload: &SubmissionPayload,
        ) -> Result<i32, BackendError> {
            let (id,): (i32,) = sqlx::query_as(include_str!("queries/create_submission.sql"))
                .bind(user_id)
                .bind(coords_id)
                .bind(&payload.beauty_title)
                .bind(&payload.title)
                .bind(&payload.other_titles)
                .bind(&payload.connect)
                .bind(&payload.level.winter)
                .bind(&payload.level.summer)
                .bind(&payload.level.autumn)
                .bind(&payload.level.spring)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

            Ok(id)
        }

        pub(super) async fn status_and_coords(
            tx: &mut Transaction<'_, Postgres>,
            id: i32,
        ) -> Result<Option<(Status, i32)>, BackendError> {
            let row: Option<(String, i32)> =
                sqlx::query_as(include_str!("queries/submission_status.sql"))
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;

            match row {
                Some((status, coords_id)) => {
                    let status = Status::from_db(&status)
                        .ok_or(BackendError::UnrecognizedStatus(status))?;

                    Ok(Some((status, coords_id)))
                }
                None => Ok(None),
            }
        }

        pub(super) async fn update_fields(
            tx: &mut Transaction<'_, Postgres>,
            id: i32,
            payload: &SubmissionPayload,
        ) -> Result<(), BackendError> {
            sqlx::query(include_str!("queries/update_submission.sql"))
                .bind(id)
                .bind(&payload.beauty_title)
                .bind(&payload.title)
                .bind(&payload.other_titles)
                .bind(&payload.connect)
                .bind(&payload.level.winter)
                .bind(&payload.level.summer)
                .bind(&payload.level.autumn)
                .bind(&payload.level.spring)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

            Ok(())
        }

        /// Reads the submission joined with its submitter and
        /// coordinates as one named-column row. The images are fetched
        /// separately; the returned payload carries an empty set.
        pub(super) async fn full_view(
            tx: &mut Transaction<'_, Postgres>,
            id: i32,
        ) -> Result<Option<(SubmissionPayload, Status)>, BackendError> {
            use crate::submission::{Coords, Level, Submitter};

            let view = sqlx::query(include_str!("queries/retrieve_submission.sql"))
                .bind(id)
                .try_map(|row: PgRow| {
                    let user = Submitter {
                        email: try_get(&row, "email")?,
                        fam: try_get(&row, "fam")?,
                        name: try_get(&row, "name")?,
                        otc: try_get(&row, "otc")?,
                        phone: try_get(&row, "phone")?,
                    };

                    let coords = Coords {
                        latitude: try_get(&row, "latitude")?,
                        longitude: try_get(&row, "longitude")?,
                        height: try_get(&row, "height")?,
                    };

                    let level = Level {
                        winter: try_get(&row, "winter_level")?,
                        summer: try_get(&row, "summer_level")?,
                        autumn: try_get(&row, "autumn_level")?,
                        spring: try_get(&row, "spring_level")?,
                    };

                    let submission = SubmissionPayload {
                        user,
                        coords,
                        level,
                        images: vec![],
                        beauty_title: try_get(&row, "beauty_title")?,
                        title: try_get(&row, "title")?,
                        other_titles: try_get(&row, "other_titles")?,
                        connect: try_get(&row, "connect")?,
                    };

                    Ok((submission, try_get_status(&row)?))
                })
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

            Ok(view)
        }
    }

    /// The image attachment store. The set is only ever replaced
    /// wholesale, preserving payload order as insertion order.
    mod images {
        use super::*;
        use crate::submission::Image;

        pub(super) async fn replace_all(
            tx: &mut Transaction<'_, Postgres>,
            submission_id: i32,
            payload: &SubmissionPayload,
        ) -> Result<(), BackendError> {
            sqlx::query(include_str!("queries/delete_images.sql"))
                .bind(submission_id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

            for image in &payload.images {
                sqlx::query(include_str!("queries/create_image.sql"))
                    .bind(submission_id)
                    .bind(&image.data)
                    .bind(&image.title)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
            }

            Ok(())
        }

        pub(super) async fn for_submission(
            tx: &mut Transaction<'_, Postgres>,
            submission_id: i32,
        ) -> Result<Vec<Image>, BackendError> {
            let images = sqlx::query(include_str!("queries/retrieve_images.sql"))
                .bind(submission_id)
                .try_map(|row: PgRow| {
                    Ok(Image {
                        data: try_get(&row, "image")?,
                        title: try_get(&row, "title")?,
                    })
                })
                .fetch_all(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

            Ok(images)
        }
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::prelude::*;

        row.try_get(column)
    }

    fn try_get_status(row: &PgRow) -> Result<Status, sqlx::Error> {
        let status: String = try_get(row, "status")?;

        Status::from_db(&status).ok_or_else(|| {
            // only possible if the database carries a status this
            // version does not know about
            sqlx::Error::Decode(Box::new(BackendError::UnrecognizedStatus(status)))
        })
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        BackendError::Sqlx { source: error }
    }
}
