use chrono::NaiveDate;
use reservations_core::db::open_db_in_memory;
use reservations_core::{
    save_with_constraints, ConstraintKind, ConstraintViolation, ErrorField, ErrorKind, Event,
    EventCandidate, EventFields, EventId, EventRepository, EventService, EventServiceError,
    RepoError, RepoResult, SaveOutcome, SqliteEventRepository,
};
use std::cell::Cell;
use uuid::Uuid;

const OVERLAPS: &str = "must not overlap existing events. Overlaps: ";

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("test date should be valid")
}

/// Repository whose validation reads miss every row until the first write
/// attempt, as if a competing writer committed between read and write.
struct StaleReadRepository<'conn> {
    inner: SqliteEventRepository<'conn>,
    stale: Cell<bool>,
}

impl<'conn> StaleReadRepository<'conn> {
    fn new(inner: SqliteEventRepository<'conn>) -> Self {
        Self {
            inner,
            stale: Cell::new(true),
        }
    }
}

impl EventRepository for StaleReadRepository<'_> {
    fn create_event(&self, fields: &EventFields) -> RepoResult<Event> {
        self.stale.set(false);
        self.inner.create_event(fields)
    }

    fn update_event(&self, id: EventId, fields: &EventFields) -> RepoResult<Event> {
        self.stale.set(false);
        self.inner.update_event(id, fields)
    }

    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>> {
        self.inner.get_event(id)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Event>> {
        if self.stale.get() {
            return Ok(None);
        }
        self.inner.find_by_name(name)
    }

    fn find_overlapping(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<EventId>,
    ) -> RepoResult<Vec<Event>> {
        if self.stale.get() {
            return Ok(Vec::new());
        }
        self.inner.find_overlapping(start, end, exclude)
    }

    fn list_events(&self) -> RepoResult<Vec<Event>> {
        self.inner.list_events()
    }
}

/// Repository that rejects every write with an overlap violation while
/// its reads never show the conflicting row, as if the competing event
/// was removed before re-validation.
struct VanishedConflictRepository {
    writes: Cell<usize>,
}

impl VanishedConflictRepository {
    fn rejection() -> RepoError {
        RepoError::Constraint(ConstraintViolation {
            kind: ConstraintKind::OverlapConflict,
        })
    }
}

impl EventRepository for VanishedConflictRepository {
    fn create_event(&self, _fields: &EventFields) -> RepoResult<Event> {
        self.writes.set(self.writes.get() + 1);
        Err(Self::rejection())
    }

    fn update_event(&self, _id: EventId, _fields: &EventFields) -> RepoResult<Event> {
        self.writes.set(self.writes.get() + 1);
        Err(Self::rejection())
    }

    fn get_event(&self, _id: EventId) -> RepoResult<Option<Event>> {
        Ok(None)
    }

    fn find_by_name(&self, _name: &str) -> RepoResult<Option<Event>> {
        Ok(None)
    }

    fn find_overlapping(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
        _exclude: Option<EventId>,
    ) -> RepoResult<Vec<Event>> {
        Ok(Vec::new())
    }

    fn list_events(&self) -> RepoResult<Vec<Event>> {
        Ok(Vec::new())
    }
}

#[test]
fn create_returns_canonical_event() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteEventRepository::try_new(&conn).expect("migrated db should be ready");
    let service = EventService::new(repo);

    let outcome = service
        .create(EventFields::new("Summer Banquet", d(2016, 6, 15), d(2016, 6, 16)))
        .expect("create should succeed");

    let event = outcome.event().expect("event should be saved").clone();
    assert!(outcome.is_saved());
    assert_eq!(outcome.errors(), None);
    assert_eq!(event.name, "Summer Banquet");
    assert_eq!(
        service.get(event.id).expect("get should succeed"),
        Some(event.clone())
    );
    assert_eq!(service.list().expect("list should succeed"), vec![event]);
}

#[test]
fn create_accepts_ranges_past_year_9999() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteEventRepository::try_new(&conn).expect("migrated db should be ready");
    let service = EventService::new(repo);
    service
        .create(EventFields::new("Launch", d(2016, 1, 1), d(2016, 1, 2)))
        .expect("create should succeed");

    let outcome = service
        .create(EventFields::new("Millennium", d(9999, 12, 30), d(10000, 1, 2)))
        .expect("create should succeed");
    let millennium = outcome.event().expect("event should be saved").clone();
    assert_eq!(millennium.end_date, d(10000, 1, 2));

    let clash = service
        .create(EventFields::new("Clash", d(10000, 1, 2), d(10000, 1, 3)))
        .expect("create should return an outcome");
    assert_eq!(
        clash.errors().expect("clash should be invalid").on(ErrorField::Base),
        vec![format!("{OVERLAPS}{}", millennium.date_range_label())]
    );

    let names: Vec<String> = service
        .list()
        .expect("list should succeed")
        .into_iter()
        .map(|event| event.name)
        .collect();
    assert_eq!(names, vec!["Launch", "Millennium"]);
}

#[test]
fn creating_same_name_twice_fails_second_time_even_with_other_dates() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteEventRepository::try_new(&conn).expect("migrated db should be ready");
    let service = EventService::new(repo);

    let first = service
        .create(EventFields::new("Gala", d(2016, 9, 1), d(2016, 9, 2)))
        .expect("create should succeed");
    assert!(first.is_saved());

    let second = service
        .create(EventFields::new("Gala", d(2017, 9, 1), d(2017, 9, 2)))
        .expect("create should return an outcome");
    assert!(!second.is_saved());
    let errors = second.errors().expect("second create should be invalid");
    assert_eq!(errors.on(ErrorField::Name), vec!["has already been taken"]);
    assert!(errors.has_kind(ErrorKind::NameConflict));
    assert_eq!(service.list().expect("list should succeed").len(), 1);
}

#[test]
fn invalid_input_is_returned_with_errors_attached() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteEventRepository::try_new(&conn).expect("migrated db should be ready");
    let service = EventService::new(repo);

    let outcome = service
        .create(EventFields::from_params("Picnic", "2016-07-04", ""))
        .expect("create should return an outcome");

    let SaveOutcome::Invalid(candidate) = outcome else {
        panic!("expected invalid outcome");
    };
    assert_eq!(candidate.id, None);
    assert_eq!(candidate.name.as_deref(), Some("Picnic"));
    assert_eq!(candidate.start_date, Some(d(2016, 7, 4)));
    assert_eq!(
        serde_json::to_value(&candidate.errors).expect("errors should serialize"),
        serde_json::json!({ "end_date": ["can't be blank"] })
    );
    assert!(service.list().expect("list should succeed").is_empty());
}

#[test]
fn update_keeping_own_range_does_not_self_overlap() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteEventRepository::try_new(&conn).expect("migrated db should be ready");
    let service = EventService::new(repo);
    let created = service
        .create(EventFields::new("Retreat", d(2016, 8, 1), d(2016, 8, 5)))
        .expect("create should succeed");
    let id = created.event().expect("event should be saved").id;

    let outcome = service
        .update(id, EventFields::new("Retreat", d(2016, 8, 1), d(2016, 8, 5)))
        .expect("update should succeed");
    assert!(outcome.is_saved());

    let outcome = service
        .update(id, EventFields::new("Team Retreat", d(2016, 8, 3), d(2016, 8, 7)))
        .expect("update should succeed");
    let event = outcome.event().expect("update should be saved");
    assert_eq!(event.id, id);
    assert_eq!(event.name, "Team Retreat");
    assert_eq!(event.start_date, d(2016, 8, 3));
}

#[test]
fn update_into_another_events_range_is_rejected() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteEventRepository::try_new(&conn).expect("migrated db should be ready");
    let service = EventService::new(repo);
    service
        .create(EventFields::new("Fair", d(2016, 10, 1), d(2016, 10, 3)))
        .expect("create should succeed");
    let movable = service
        .create(EventFields::new("Market", d(2016, 11, 1), d(2016, 11, 2)))
        .expect("create should succeed");
    let id = movable.event().expect("event should be saved").id;

    let outcome = service
        .update(id, EventFields::new("Market", d(2016, 10, 3), d(2016, 10, 4)))
        .expect("update should return an outcome");

    let errors = outcome.errors().expect("update should be invalid");
    assert_eq!(
        errors.on(ErrorField::Base),
        vec![format!("{OVERLAPS}2016-10-01 to 2016-10-03")]
    );
    assert_eq!(
        service.get(id).expect("get should succeed"),
        movable.event().cloned()
    );
}

#[test]
fn update_of_unknown_event_is_not_found() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteEventRepository::try_new(&conn).expect("migrated db should be ready");
    let service = EventService::new(repo);
    let id = Uuid::new_v4();

    let err = service
        .update(id, EventFields::new("Ghost", d(2016, 6, 1), d(2016, 6, 2)))
        .expect_err("unknown id should not update");
    assert!(matches!(err, EventServiceError::EventNotFound(missing) if missing == id));
}

#[test]
fn stale_validation_reads_are_reconciled_into_overlap_errors() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let inner = SqliteEventRepository::try_new(&conn).expect("migrated db should be ready");
    inner
        .create_event(&EventFields::new("Winner", d(2016, 6, 10), d(2016, 6, 12)))
        .expect("seed event should be stored");
    let repo = StaleReadRepository::new(inner);

    let mut candidate =
        EventCandidate::new(EventFields::new("Loser", d(2016, 6, 12), d(2016, 6, 14)));
    let saved = save_with_constraints(&repo, &mut candidate, true)
        .expect("constraint violation should be reconciled");

    assert!(!saved);
    assert_eq!(candidate.id, None);
    assert_eq!(
        candidate.errors.on(ErrorField::Base),
        vec![format!("{OVERLAPS}2016-06-10 to 2016-06-12")]
    );
    assert_eq!(repo.list_events().expect("list should succeed").len(), 1);
}

#[test]
fn stale_validation_reads_are_reconciled_into_name_errors() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let inner = SqliteEventRepository::try_new(&conn).expect("migrated db should be ready");
    inner
        .create_event(&EventFields::new("Gala", d(2016, 6, 10), d(2016, 6, 12)))
        .expect("seed event should be stored");
    let service = EventService::new(StaleReadRepository::new(inner));

    let outcome = service
        .create(EventFields::new("Gala", d(2017, 1, 1), d(2017, 1, 2)))
        .expect("constraint violation should be reconciled");

    let errors = outcome.errors().expect("create should be invalid");
    assert_eq!(errors.on(ErrorField::Name), vec!["has already been taken"]);
    assert!(errors.on(ErrorField::Base).is_empty());
}

#[test]
fn violation_without_visible_conflict_still_fails_the_save() {
    let repo = VanishedConflictRepository {
        writes: Cell::new(0),
    };

    let mut candidate =
        EventCandidate::new(EventFields::new("Orphan", d(2016, 6, 1), d(2016, 6, 2)));
    let saved = save_with_constraints(&repo, &mut candidate, true)
        .expect("constraint violation should not be fatal");

    assert!(!saved);
    assert!(candidate.errors.is_empty());
    assert_eq!(candidate.id, None);
    assert_eq!(repo.writes.get(), 1);
}

#[test]
fn skipping_validation_still_reports_friendly_errors() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteEventRepository::try_new(&conn).expect("migrated db should be ready");
    repo.create_event(&EventFields::new("Summer Event 3", d(2016, 6, 3), d(2016, 6, 4)))
        .expect("seed event should be stored");

    let mut candidate =
        EventCandidate::new(EventFields::new("Summer Fling", d(2016, 6, 3), d(2016, 6, 7)));
    assert!(!save_with_constraints(&repo, &mut candidate, false)
        .expect("constraint violation should be reconciled"));
    assert_eq!(
        candidate.errors.on(ErrorField::Base),
        vec![format!("{OVERLAPS}2016-06-03 to 2016-06-04")]
    );

    let mut clean = EventCandidate::new(EventFields::new("Later", d(2016, 7, 1), d(2016, 7, 2)));
    assert!(save_with_constraints(&repo, &mut clean, false).expect("save should succeed"));
    assert!(clean.is_persisted());
    assert!(clean.errors.is_empty());
}

#[test]
fn non_constraint_store_failures_propagate() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteEventRepository::try_new(&conn).expect("migrated db should be ready");

    let mut reversed =
        EventCandidate::new(EventFields::new("Backwards", d(2016, 6, 10), d(2016, 6, 5)));
    let err = save_with_constraints(&repo, &mut reversed, false)
        .expect_err("check constraint failure should propagate");
    assert!(matches!(err, RepoError::Db(_)));
    assert!(!reversed.is_persisted());
}

#[test]
fn failed_save_clears_previous_errors_on_retry() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let repo = SqliteEventRepository::try_new(&conn).expect("migrated db should be ready");

    let mut candidate =
        EventCandidate::new(EventFields::from_params("", "2016-06-01", "2016-06-02"));
    assert!(!save_with_constraints(&repo, &mut candidate, true).expect("validation should run"));
    assert_eq!(candidate.errors.on(ErrorField::Name), vec!["can't be blank"]);

    candidate.name = Some("Named".to_string());
    assert!(save_with_constraints(&repo, &mut candidate, true).expect("save should succeed"));
    assert!(candidate.errors.is_empty());
    assert!(candidate.is_persisted());
}
