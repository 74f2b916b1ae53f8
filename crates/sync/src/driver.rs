//! Runs a confirmed country's dataset fetches and feeds them to the session.
//!
//! Both fetches run concurrently on the current thread; each result is
//! applied the moment it completes, so the ADM2 camera transition never
//! waits for IR.

use formats::FeatureCollection;
use futures_util::stream::FuturesUnordered;
use futures_util::{Stream, StreamExt};
use layers::RenderSurface;
use streaming::{DatasetSource, DatasetTicket, FetchFailure};
use tracing::debug;

use crate::engine::Applied;
use crate::session::MapSession;

/// A finished fetch, ready for [`MapSession::complete`].
pub type Completed = (DatasetTicket, Result<FeatureCollection, FetchFailure>);

/// Starts every ticket's fetch and yields results as they complete.
///
/// Holds no reference to the session, so callers that keep the session
/// behind a `RefCell` can borrow it per result.
pub fn fetch_tickets<'a, D>(
    source: &'a D,
    tickets: Vec<DatasetTicket>,
) -> impl Stream<Item = Completed> + Unpin + 'a
where
    D: DatasetSource + ?Sized,
{
    tickets
        .into_iter()
        .map(move |ticket| async move {
            debug!(location = %source.location(&ticket.country, ticket.kind), "fetching dataset");
            let result = source.fetch(&ticket.country, ticket.kind).await;
            (ticket, result)
        })
        .collect::<FuturesUnordered<_>>()
}

/// Confirms the pending country and loads its datasets from `source`.
/// Returns one outcome per completed fetch, in completion order.
pub async fn submit_and_load<S, D>(session: &mut MapSession<S>, source: &D) -> Vec<Applied>
where
    S: RenderSurface,
    D: DatasetSource + ?Sized,
{
    let tickets = session.submit();
    let mut inflight = fetch_tickets(source, tickets);
    let mut outcomes = Vec::new();
    while let Some((ticket, result)) = inflight.next().await {
        outcomes.push(session.complete(&ticket, result));
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::submit_and_load;
    use crate::config::SyncConfig;
    use crate::engine::Applied;
    use crate::session::MapSession;
    use formats::DatasetKind;
    use foundation::CountryCode;
    use layers::RecordingSurface;
    use streaming::StaticSource;

    const ADM2: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"adm2_id":"COL_1_1","case_type":"Case 1"},
         "geometry":{"type":"Polygon","coordinates":[[[-75,4],[-74,4],[-74,5],[-75,5],[-75,4]]]}}]}"#;

    fn col() -> CountryCode {
        CountryCode::parse("COL").expect("code")
    }

    #[tokio::test]
    async fn loads_both_datasets() {
        let source = StaticSource::new()
            .with(&col(), DatasetKind::Adm2, ADM2)
            .with(&col(), DatasetKind::Ir, r#"{"type":"FeatureCollection","features":[]}"#);
        let mut session = MapSession::new(RecordingSurface::new(), SyncConfig::default());
        session.set_pending(col());
        let outcomes = submit_and_load(&mut session, &source).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| matches!(o, Applied::Loaded { .. })));
        assert!(!session.store().is_loading());
        assert!(session.store().error().is_none());
        assert_eq!(session.surface().flights().len(), 1);
    }

    #[tokio::test]
    async fn missing_ir_keeps_adm2() {
        let source = StaticSource::new().with(&col(), DatasetKind::Adm2, ADM2);
        let mut session = MapSession::new(RecordingSurface::new(), SyncConfig::default());
        session.set_pending(col());
        let outcomes = submit_and_load(&mut session, &source).await;

        assert!(outcomes.contains(&Applied::Failed {
            kind: DatasetKind::Ir,
            message: "No impact regions dataset is available for COL.".to_string(),
        }));
        assert_eq!(session.surface().source_count(), 1);
        assert!(!session.store().is_loading());
        assert!(session.store().error().is_some());
    }

    #[tokio::test]
    async fn malformed_adm2_is_reported() {
        let source = StaticSource::new().with(&col(), DatasetKind::Adm2, "{\"type\":\"Feature\"}");
        let mut session = MapSession::new(RecordingSurface::new(), SyncConfig::default());
        session.set_pending(col());
        let outcomes = submit_and_load(&mut session, &source).await;

        assert!(outcomes.contains(&Applied::Failed {
            kind: DatasetKind::Adm2,
            message: "The ADM2 boundaries dataset for COL could not be read.".to_string(),
        }));
        assert!(!session.store().is_loading());
        assert!(session.store().error().is_some());
        assert_eq!(session.surface().source_count(), 0);
        assert!(session.surface().flights().is_empty());
    }

    #[tokio::test]
    async fn nothing_pending_is_a_noop() {
        let mut session = MapSession::new(RecordingSurface::new(), SyncConfig::default());
        let outcomes = submit_and_load(&mut session, &StaticSource::new()).await;
        assert!(outcomes.is_empty());
    }
}
