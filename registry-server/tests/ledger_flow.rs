//! Ledger flow tests - full allocation and reclamation cycles
//!
//! Each test drives the public ledgers end to end against a real SQLite
//! database and checks the counters after every step.

use registry_server::db::repository::{issn_form, issn_publication, publication, publisher};
use registry_server::ledger::checksum::validate_isbn13;
use registry_server::{
    BatchLedger, CurrentUser, DbService, ErrorCode, IdentifierRetirement, IssnLedger, RangeLedger,
    SubRangeLedger,
};
use shared::models::{
    BatchRequest, IdentifierMap, IdentifierType, IssnForm, IssnFormStatus, IssnRangeCreate,
    Publication, PublicationCreate, PublicationFormat, PublicationType, PublisherCreate, Range,
    RangeCreate, SubRange, SubRangeSelection,
};

fn admin() -> CurrentUser {
    CurrentUser::new(1, "admin")
}

/// Ledgers of one identifier type over a shared pool
struct Registry {
    db: DbService,
    ranges: RangeLedger,
    sub_ranges: SubRangeLedger,
    retirement: IdentifierRetirement,
    batches: BatchLedger,
}

impl Registry {
    fn new(db: DbService, identifier_type: IdentifierType) -> Self {
        Self {
            ranges: RangeLedger::new(db.pool.clone(), identifier_type),
            sub_ranges: SubRangeLedger::new(db.pool.clone(), identifier_type),
            retirement: IdentifierRetirement::new(db.pool.clone()),
            batches: BatchLedger::new(db.pool.clone()),
            db,
        }
    }

    async fn active_range(&self, data: RangeCreate) -> Range {
        let r = self.ranges.create(data, &admin()).await.unwrap();
        self.ranges.activate(r.id, &admin()).await.unwrap()
    }

    async fn add_publisher(&self, name: &str) -> i64 {
        let mut conn = self.db.pool.acquire().await.unwrap();
        publisher::create(&mut conn, &PublisherCreate { name: name.into() })
            .await
            .unwrap()
            .id
    }

    async fn carve(&self, range_id: i64, publisher_id: i64) -> SubRange {
        self.ranges
            .generate_subrange(range_id, publisher_id, SubRangeSelection::Next, &admin())
            .await
            .unwrap()
    }

    async fn list(&self, publisher_id: i64, n: i64) -> Vec<String> {
        self.sub_ranges
            .generate_identifier_batch(publisher_id, BatchRequest::Count(n), &admin())
            .await
            .unwrap()
            .identifiers
            .into_iter()
            .map(|i| i.identifier)
            .collect()
    }
}

fn finnish_books(category: i64, begin: &str, end: &str) -> RangeCreate {
    RangeCreate {
        prefix: "978".into(),
        lang_group: "951".into(),
        category,
        range_begin: begin.into(),
        range_end: end.into(),
    }
}

async fn load_publication(db: &DbService, id: i64) -> Publication {
    let mut conn = db.pool.acquire().await.unwrap();
    publication::find_by_id(&mut conn, id).await.unwrap().unwrap()
}

async fn load_form(db: &DbService, id: i64) -> IssnForm {
    let mut conn = db.pool.acquire().await.unwrap();
    issn_form::find_by_id(&mut conn, id).await.unwrap().unwrap()
}

fn assert_sub_range_balanced(sr: &SubRange) {
    assert_eq!(
        sr.free + sr.taken + sr.canceled + sr.deleted,
        sr.capacity(),
        "sub-range {} counters out of balance: {sr:?}",
        sr.id
    );
}

fn assert_range_balanced(r: &Range, capacity: i64) {
    assert_eq!(
        r.free + r.taken + r.canceled,
        capacity,
        "range {} counters out of balance: {r:?}",
        r.id
    );
}

#[tokio::test]
async fn test_issue_cancel_and_reissue_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");
    let db = DbService::new(path.to_str().unwrap(), 4).await.unwrap();
    let reg = Registry::new(db, IdentifierType::Isbn);

    let range = reg.active_range(finnish_books(3, "000", "005")).await;
    assert_range_balanced(&range, 6);
    let publisher_id = reg.add_publisher("WSOY").await;
    let sr = reg.carve(range.id, publisher_id).await;
    assert_eq!(sr.publisher_identifier, "978-951-000");

    let first = reg.list(publisher_id, 3).await;
    assert_eq!(
        first,
        ["978-951-000-000-7", "978-951-000-001-4", "978-951-000-002-1"]
    );
    assert!(first.iter().all(|v| validate_isbn13(v)));

    reg.retirement.cancel(&first[1], &admin(), None).await.unwrap();
    let sr = reg.sub_ranges.read(sr.id).await.unwrap();
    assert_eq!((sr.free, sr.taken, sr.canceled), (997, 2, 1));
    assert_sub_range_balanced(&sr);

    let second = reg.list(publisher_id, 1).await;
    assert_eq!(second, ["978-951-000-001-4"]);
    let sr = reg.sub_ranges.read(sr.id).await.unwrap();
    assert_eq!((sr.free, sr.taken, sr.canceled), (997, 3, 0));
    assert_eq!(sr.next, "003");
    assert_sub_range_balanced(&sr);

    let third = reg.list(publisher_id, 1).await;
    assert_eq!(third, ["978-951-000-003-8"]);

    let range = reg.ranges.read(range.id).await.unwrap();
    assert_eq!((range.next.as_str(), range.free, range.taken), ("001", 5, 1));
    assert_range_balanced(&range, 6);
}

#[tokio::test]
async fn test_exhaustion_closes_and_cancellation_reopens() {
    let db = DbService::open_in_memory().await.unwrap();
    let reg = Registry::new(db, IdentifierType::Isbn);

    // One publisher identifier, ten items
    let range = reg.active_range(finnish_books(1, "00000", "00000")).await;
    let publisher_id = reg.add_publisher("Tammi").await;
    let sr = reg.carve(range.id, publisher_id).await;

    let range = reg.ranges.read(range.id).await.unwrap();
    assert!(range.is_closed && !range.is_active);
    assert_range_balanced(&range, 1);
    let err = reg
        .ranges
        .generate_subrange(range.id, publisher_id, SubRangeSelection::Next, &admin())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RangeClosed);

    let issued = reg.list(publisher_id, 10).await;
    assert_eq!(issued.len(), 10);
    assert_eq!(issued[9], "978-951-00000-9-0");
    let sr_now = reg.sub_ranges.read(sr.id).await.unwrap();
    assert!(sr_now.is_closed && !sr_now.is_active);
    assert_eq!((sr_now.free, sr_now.taken), (0, 10));

    let err = reg
        .sub_ranges
        .generate_identifier_batch(publisher_id, BatchRequest::Count(1), &admin())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NoActiveSubRange);

    reg.retirement.cancel(&issued[4], &admin(), None).await.unwrap();
    let sr_now = reg.sub_ranges.read(sr.id).await.unwrap();
    assert!(!sr_now.is_closed && sr_now.is_active);
    assert_sub_range_balanced(&sr_now);

    assert_eq!(reg.list(publisher_id, 1).await, [issued[4].clone()]);
    let sr_now = reg.sub_ranges.read(sr.id).await.unwrap();
    assert!(sr_now.is_closed && !sr_now.is_active);
    assert_sub_range_balanced(&sr_now);
}

#[tokio::test]
async fn test_batches_roll_back_newest_first() {
    let db = DbService::open_in_memory().await.unwrap();
    let reg = Registry::new(db, IdentifierType::Isbn);

    let range = reg.active_range(finnish_books(3, "000", "005")).await;
    let publisher_id = reg.add_publisher("Otava").await;
    let sr = reg.carve(range.id, publisher_id).await;

    let older = reg
        .sub_ranges
        .generate_identifier_batch(publisher_id, BatchRequest::Count(2), &admin())
        .await
        .unwrap()
        .batch;
    let newer = reg
        .sub_ranges
        .generate_identifier_batch(publisher_id, BatchRequest::Count(3), &admin())
        .await
        .unwrap()
        .batch;

    let err = reg.batches.safe_remove(older.id, &admin(), None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BatchNotLast);

    reg.batches.safe_remove(newer.id, &admin(), None).await.unwrap();
    let sr_now = reg.sub_ranges.read(sr.id).await.unwrap();
    assert_eq!((sr_now.next.as_str(), sr_now.free, sr_now.taken), ("002", 998, 2));

    reg.batches.safe_remove(older.id, &admin(), None).await.unwrap();
    let sr_now = reg.sub_ranges.read(sr.id).await.unwrap();
    assert_eq!((sr_now.next.as_str(), sr_now.free, sr_now.taken), ("000", 1000, 0));
    assert_sub_range_balanced(&sr_now);

    let err = reg.batches.read(older.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BatchNotFound);

    // Nothing left behind: the sub-range itself can go
    reg.sub_ranges.remove(sr.id, &admin()).await.unwrap();
    let range = reg.ranges.read(range.id).await.unwrap();
    assert_eq!((range.next.as_str(), range.free, range.taken), ("000", 6, 0));
    assert!(range.is_active && !range.is_closed);

    let mut conn = reg.db.pool.acquire().await.unwrap();
    let p = publisher::find_by_id(&mut conn, publisher_id).await.unwrap().unwrap();
    assert_eq!(p.active_identifier_isbn, None);
}

#[tokio::test]
async fn test_removed_sub_range_is_archived_and_reused() {
    let db = DbService::open_in_memory().await.unwrap();
    let reg = Registry::new(db, IdentifierType::Isbn);

    let range = reg.active_range(finnish_books(3, "000", "005")).await;
    let first_owner = reg.add_publisher("Karisto").await;
    let second_owner = reg.add_publisher("Siltala").await;
    let older = reg.carve(range.id, first_owner).await;
    reg.carve(range.id, second_owner).await;

    reg.sub_ranges.remove(older.id, &admin()).await.unwrap();
    let options = reg.ranges.subrange_options(range.id).await.unwrap();
    assert_eq!(options.next.as_deref(), Some("978-951-002"));
    assert_eq!(options.canceled.len(), 1);
    assert_eq!(options.canceled[0].identifier, "000");

    let range_now = reg.ranges.read(range.id).await.unwrap();
    assert_eq!((range_now.free, range_now.taken, range_now.canceled), (4, 1, 1));
    assert_range_balanced(&range_now, 6);

    let reused = reg
        .ranges
        .generate_subrange(
            range.id,
            first_owner,
            SubRangeSelection::Canceled(options.canceled[0].id),
            &admin(),
        )
        .await
        .unwrap();
    assert_eq!(reused.publisher_identifier, "978-951-000");
    let range_now = reg.ranges.read(range.id).await.unwrap();
    assert_eq!((range_now.free, range_now.taken, range_now.canceled), (4, 2, 0));
}

#[tokio::test]
async fn test_sheet_music_publication_cycle() {
    let db = DbService::open_in_memory().await.unwrap();
    let reg = Registry::new(db, IdentifierType::Ismn);

    let range = reg
        .active_range(RangeCreate {
            prefix: "979-0".into(),
            lang_group: String::new(),
            category: 4,
            range_begin: "2600".into(),
            range_end: "2699".into(),
        })
        .await;
    let publisher_id = reg.add_publisher("Fazer Musiikki").await;
    reg.carve(range.id, publisher_id).await;

    let publication_id = {
        let mut conn = reg.db.pool.acquire().await.unwrap();
        publication::create(
            &mut conn,
            &PublicationCreate {
                publisher_id: Some(publisher_id),
                title: "Finlandia".into(),
                publication_type: PublicationType::SheetMusic,
                publication_format: PublicationFormat::PrintElectronical,
                print_types: vec!["SHEET_MUSIC".into()],
                file_formats: vec!["PDF".into()],
                is_public: true,
            },
        )
        .await
        .unwrap()
        .id
    };

    let detail = reg
        .sub_ranges
        .generate_identifier_batch(publisher_id, BatchRequest::Publication(publication_id), &admin())
        .await
        .unwrap();
    let issued: Vec<_> = detail.identifiers.iter().map(|i| i.identifier.clone()).collect();
    assert_eq!(issued, ["979-0-2600-0000-1", "979-0-2600-0001-8"]);

    let p = load_publication(&reg.db, publication_id).await;
    assert!(!p.on_process);
    assert_eq!(p.publication_identifier_type, Some(IdentifierType::Ismn));
    let print = IdentifierMap::parse(&p.publication_identifier_print).unwrap();
    let electronical = IdentifierMap::parse(&p.publication_identifier_electronical).unwrap();
    assert_eq!(print.get(&issued[0]), Some("SHEET_MUSIC"));
    assert_eq!(electronical.get(&issued[1]), Some("PDF"));

    let err = reg
        .sub_ranges
        .generate_identifier_batch(publisher_id, BatchRequest::Publication(publication_id), &admin())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PublicationAlreadyIdentified);

    // First cancellation only detaches the identifier
    reg.retirement.cancel(&issued[0], &admin(), None).await.unwrap();
    let p = load_publication(&reg.db, publication_id).await;
    assert!(p.publication_identifier_print.is_empty());
    assert!(p.has_identifiers());
    let batch = reg.batches.read(detail.batch.id).await.unwrap();
    assert_eq!(batch.batch.identifier_canceled_count, 1);

    // Last one takes the batch with it and frees the publication
    reg.retirement.cancel(&issued[1], &admin(), None).await.unwrap();
    let p = load_publication(&reg.db, publication_id).await;
    assert!(p.on_process && !p.has_identifiers());
    assert_eq!(p.publication_identifier_type, None);
    let err = reg.batches.read(detail.batch.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BatchNotFound);

    // Reissued from the pool
    let again = reg
        .sub_ranges
        .generate_identifier_batch(publisher_id, BatchRequest::Publication(publication_id), &admin())
        .await
        .unwrap();
    let mut reissued: Vec<_> = again.identifiers.iter().map(|i| i.identifier.clone()).collect();
    reissued.sort();
    assert_eq!(reissued, issued);
    assert_eq!(again.batch.identifier_canceled_used_count, 2);
    assert_eq!(again.batch.identifier_count, 0);
}

#[tokio::test]
async fn test_removed_identifiers_are_never_reissued() {
    let db = DbService::open_in_memory().await.unwrap();
    let reg = Registry::new(db, IdentifierType::Isbn);

    let range = reg.active_range(finnish_books(3, "000", "005")).await;
    let publisher_id = reg.add_publisher("Schildts").await;
    let sr = reg.carve(range.id, publisher_id).await;

    let issued = reg.list(publisher_id, 4).await;
    reg.retirement.remove(&issued[0], &admin(), None).await.unwrap();
    reg.retirement.cancel(&issued[1], &admin(), None).await.unwrap();

    let sr_now = reg.sub_ranges.read(sr.id).await.unwrap();
    assert_eq!(
        (sr_now.free, sr_now.taken, sr_now.canceled, sr_now.deleted),
        (996, 2, 1, 1)
    );
    assert_sub_range_balanced(&sr_now);

    let next = reg.list(publisher_id, 2).await;
    assert_eq!(next, [issued[1].clone(), "978-951-000-004-5".to_string()]);

    let err = reg
        .retirement
        .cancel(&issued[0], &admin(), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::IdentifierNotFound);

    // Issued identifiers pin the sub-range
    let err = reg.sub_ranges.remove(sr.id, &admin()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SubRangeInUse);
}

#[tokio::test]
async fn test_issn_cycle_updates_form() {
    let db = DbService::open_in_memory().await.unwrap();
    let ledger = IssnLedger::new(db.pool.clone());

    let r = ledger
        .create(
            IssnRangeCreate {
                block: "1234".into(),
                range_begin: "0006".into(),
                range_end: "0049".into(),
            },
            &admin(),
        )
        .await
        .unwrap();
    assert_eq!(r.free, 5);
    ledger.activate(r.id, &admin()).await.unwrap();

    let (form_id, publications) = {
        let mut conn = db.pool.acquire().await.unwrap();
        let form = issn_form::create(&mut conn, "Yhtyneet Kuvalehdet", 2).await.unwrap();
        let a = issn_publication::create(&mut conn, form.id, "Apu").await.unwrap();
        let b = issn_publication::create(&mut conn, form.id, "Seura").await.unwrap();
        (form.id, [a.id, b.id])
    };

    let first = ledger.get_issn(publications[0], &admin()).await.unwrap();
    assert_eq!(first.issn, "1234-0006");
    assert_eq!(load_form(&db, form_id).await.status, IssnFormStatus::NotHandled);

    let second = ledger.get_issn(publications[1], &admin()).await.unwrap();
    assert_eq!(second.issn, "1234-0014");
    let form = load_form(&db, form_id).await;
    assert_eq!((form.publication_count_issn, form.status), (2, IssnFormStatus::NotNotified));

    let err = ledger.get_issn(publications[1], &admin()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::IssnAlreadyAssigned);

    // Older ISSN goes to the pool, then comes back first
    ledger.delete_issn(publications[0], &admin()).await.unwrap();
    let form = load_form(&db, form_id).await;
    assert_eq!((form.publication_count_issn, form.status), (1, IssnFormStatus::NotHandled));
    let r_now = ledger.read(r.id).await.unwrap();
    assert_eq!((r_now.next.as_str(), r_now.free, r_now.taken, r_now.canceled), ("0022", 3, 1, 1));

    let again = ledger.get_issn(publications[0], &admin()).await.unwrap();
    assert_eq!(again.issn, "1234-0006");
    let r_now = ledger.read(r.id).await.unwrap();
    assert_eq!((r_now.free, r_now.taken, r_now.canceled), (3, 2, 0));

    // Latest ISSN rolls the range back
    ledger.delete_issn(publications[1], &admin()).await.unwrap();
    let r_now = ledger.read(r.id).await.unwrap();
    assert_eq!((r_now.next.as_str(), r_now.free, r_now.taken), ("0014", 4, 1));

    let err = ledger.delete_issn(publications[1], &admin()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::PublicationHasNoIssn);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_batches_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");
    let db = DbService::new(path.to_str().unwrap(), 8).await.unwrap();
    let reg = Registry::new(db, IdentifierType::Isbn);

    let range = reg.active_range(finnish_books(3, "000", "005")).await;
    let publisher_id = reg.add_publisher("Otava").await;
    let sr = reg.carve(range.id, publisher_id).await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let ledger = reg.sub_ranges.clone();
            tokio::spawn(async move {
                ledger
                    .generate_identifier_batch(publisher_id, BatchRequest::Count(5), &admin())
                    .await
            })
        })
        .collect();

    let mut issued = std::collections::HashSet::new();
    for task in tasks {
        let batch = task.await.unwrap().unwrap();
        assert_eq!(batch.identifiers.len(), 5);
        issued.extend(batch.identifiers.into_iter().map(|i| i.identifier));
    }
    assert_eq!(issued.len(), 40);

    let sr = reg.sub_ranges.read(sr.id).await.unwrap();
    assert_eq!((sr.next.as_str(), sr.free, sr.taken), ("040", 960, 40));
    assert_sub_range_balanced(&sr);
}
