use calldeck_core::db::open_db_in_memory;
use calldeck_core::{
    CallingService, CallingServiceError, ContactId, ContactRepository, ImportRow, ImportService,
    LedgerService, PrioritizeOutcome, PrioritizeRequest, PriorityResponse, QueueFilter,
    ScriptOutcome, ScriptRequest, ScriptSuggestion, SqliteContactRepository,
    SqliteInteractionRepository, SuggestError, SuggestionClient,
};
use rusqlite::Connection;
use std::cell::RefCell;
use uuid::Uuid;

#[derive(Default)]
struct FakeSuggestions {
    ordered_ids: Option<Vec<String>>,
    script: Option<ScriptSuggestion>,
    seen_priority: RefCell<Option<PrioritizeRequest>>,
    seen_script: RefCell<Option<ScriptRequest>>,
}

impl SuggestionClient for FakeSuggestions {
    fn request_script(&self, request: &ScriptRequest) -> Result<ScriptSuggestion, SuggestError> {
        *self.seen_script.borrow_mut() = Some(request.clone());
        self.script
            .clone()
            .ok_or_else(|| SuggestError::Transport("timed out".to_string()))
    }

    fn request_priority(
        &self,
        request: &PrioritizeRequest,
    ) -> Result<PriorityResponse, SuggestError> {
        *self.seen_priority.borrow_mut() = Some(request.clone());
        self.ordered_ids
            .clone()
            .map(|ordered_ids| PriorityResponse { ordered_ids })
            .ok_or_else(|| SuggestError::Parse("not json".to_string()))
    }
}

type SqliteCalling<'conn, S> =
    CallingService<SqliteContactRepository<'conn>, SqliteInteractionRepository<'conn>, S>;

fn calling<S: SuggestionClient>(
    conn: &Connection,
    suggestions: Option<S>,
) -> SqliteCalling<'_, S> {
    CallingService::new(
        SqliteContactRepository::try_new(conn).unwrap(),
        LedgerService::new(SqliteInteractionRepository::try_new(conn).unwrap(), "priya"),
        suggestions,
    )
}

/// Seeds X, Y, Z in creation order and engages Y.
fn seed_xyz<S: SuggestionClient>(
    conn: &Connection,
    service: &mut SqliteCalling<'_, S>,
) -> (ContactId, ContactId, ContactId) {
    let mut importer = ImportService::new(SqliteContactRepository::try_new(conn).unwrap());
    let rows = ["X", "Y", "Z"]
        .iter()
        .map(|name| ImportRow {
            full_name: name.to_string(),
            org: None,
            phone: "555".to_string(),
            email: None,
            notes: None,
            tags: Some(vec!["warm".to_string()]),
        })
        .collect();
    let ids = importer.import_rows(rows).unwrap().inserted_ids;
    service.record_note(ids[1], "sent brochure").unwrap();
    (ids[0], ids[1], ids[2])
}

#[test]
fn default_queue_calls_never_engaged_first_in_creation_order() {
    let conn = open_db_in_memory().unwrap();
    let mut service = calling::<FakeSuggestions>(&conn, None);
    let (x, y, z) = seed_xyz(&conn, &mut service);

    let queue = service.load_queue(QueueFilter::All).unwrap();
    assert_eq!(queue.ids(), vec![x, z, y]);
    assert_eq!(queue.stats.total, 3);
    assert_eq!(queue.stats.contacted, 1);
    assert_eq!(queue.next().map(|contact| contact.id), Some(x));

    let never = service.load_queue(QueueFilter::Never).unwrap();
    assert_eq!(never.ids(), vec![x, z]);
    assert_eq!(never.stats.total, 3);
}

#[test]
fn engaging_a_contact_moves_it_to_the_back_on_next_read() {
    let conn = open_db_in_memory().unwrap();
    let mut service = calling::<FakeSuggestions>(&conn, None);
    let (x, y, z) = seed_xyz(&conn, &mut service);

    service.record_call(x, Some("no answer")).unwrap();
    let queue = service.load_queue(QueueFilter::All).unwrap();
    assert_eq!(queue.ids(), vec![z, y, x]);
}

#[test]
fn prioritize_overlays_suggestion_and_keeps_every_contact() {
    let conn = open_db_in_memory().unwrap();
    let mut service = calling::<FakeSuggestions>(&conn, None);
    let (x, y, z) = seed_xyz(&conn, &mut service);

    let suggestions = FakeSuggestions {
        ordered_ids: Some(vec![
            z.to_string(),
            "made-up-id".to_string(),
            Uuid::new_v4().to_string(),
            y.to_string(),
            z.to_string(),
        ]),
        ..FakeSuggestions::default()
    };
    let service = calling(&conn, Some(&suggestions));
    let queue = service.load_queue(QueueFilter::All).unwrap();

    let outcome = service.prioritize(queue);
    assert!(matches!(outcome, PrioritizeOutcome::Reordered(_)));
    assert_eq!(outcome.queue().ids(), vec![z, y, x]);

    let sent = suggestions.seen_priority.borrow().clone().unwrap();
    assert_eq!(sent.contacts.len(), 3);
    let y_candidate = sent
        .contacts
        .iter()
        .find(|candidate| candidate.id == y.to_string())
        .unwrap();
    assert_eq!(y_candidate.interactions_count, Some(1));
    assert!(y_candidate.last_engaged_at.is_some());
    assert_eq!(y_candidate.tags, Some(vec!["warm".to_string()]));
}

#[test]
fn prioritize_failure_or_empty_answer_leaves_queue_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let mut service = calling::<FakeSuggestions>(&conn, None);
    let (x, y, z) = seed_xyz(&conn, &mut service);

    let failing = FakeSuggestions::default();
    let empty = FakeSuggestions {
        ordered_ids: Some(Vec::new()),
        ..FakeSuggestions::default()
    };
    for client in [&failing, &empty] {
        let service = calling(&conn, Some(client));
        let queue = service.load_queue(QueueFilter::All).unwrap();
        let outcome = service.prioritize(queue);
        assert!(matches!(outcome, PrioritizeOutcome::Unchanged(_)));
        assert_eq!(outcome.into_queue().ids(), vec![x, z, y]);
    }

    let queue = service.load_queue(QueueFilter::All).unwrap();
    assert!(matches!(
        service.prioritize(queue),
        PrioritizeOutcome::Unchanged(_)
    ));
}

#[test]
fn draft_script_sends_recent_notes_and_degrades_to_unavailable() {
    let conn = open_db_in_memory().unwrap();
    let mut service = calling::<FakeSuggestions>(&conn, None);
    let (x, y, _) = seed_xyz(&conn, &mut service);

    assert_eq!(service.draft_script(y).unwrap(), ScriptOutcome::Unavailable);

    let ready = FakeSuggestions {
        script: Some(ScriptSuggestion {
            call_script: "Hi Y, following up on the brochure.".to_string(),
            whatsapp_message: "Hi Y! Did the brochure land?".to_string(),
        }),
        ..FakeSuggestions::default()
    };
    let service_with_ai = calling(&conn, Some(&ready));
    let outcome = service_with_ai.draft_script(y).unwrap();
    assert!(matches!(
        outcome,
        ScriptOutcome::Ready(ref script) if script.call_script.contains("brochure")
    ));
    let sent = ready.seen_script.borrow().clone().unwrap();
    assert_eq!(sent.contact.full_name, "Y");
    assert_eq!(sent.notes, Some(vec!["sent brochure".to_string()]));

    let broken = FakeSuggestions::default();
    let service_broken = calling(&conn, Some(&broken));
    assert_eq!(service_broken.draft_script(x).unwrap(), ScriptOutcome::Unavailable);
    assert_eq!(broken.seen_script.borrow().clone().unwrap().notes, None);
}

#[test]
fn draft_script_notes_survive_a_run_of_bare_calls() {
    let conn = open_db_in_memory().unwrap();
    let mut service = calling::<FakeSuggestions>(&conn, None);
    let (_, y, _) = seed_xyz(&conn, &mut service);
    for _ in 0..6 {
        service.record_call(y, None).unwrap();
    }
    for round in 0..6 {
        service.record_note(y, &format!("note {round}")).unwrap();
    }

    let ready = FakeSuggestions {
        script: Some(ScriptSuggestion {
            call_script: "Hi Y.".to_string(),
            whatsapp_message: "Hi Y!".to_string(),
        }),
        ..FakeSuggestions::default()
    };
    calling(&conn, Some(&ready)).draft_script(y).unwrap();
    let sent = ready.seen_script.borrow().clone().unwrap();
    assert_eq!(
        sent.notes,
        Some(
            ["note 5", "note 4", "note 3", "note 2", "note 1"]
                .iter()
                .map(|note| note.to_string())
                .collect::<Vec<_>>()
        )
    );

    let calls_only = FakeSuggestions {
        script: ready.script.clone(),
        ..FakeSuggestions::default()
    };
    let (_, second_y, _) = seed_xyz(&conn, &mut service);
    for _ in 0..5 {
        service.record_call(second_y, None).unwrap();
    }
    calling(&conn, Some(&calls_only)).draft_script(second_y).unwrap();
    assert_eq!(
        calls_only.seen_script.borrow().clone().unwrap().notes,
        Some(vec!["sent brochure".to_string()])
    );
}

#[test]
fn unknown_contact_is_an_error_not_an_unavailable_script() {
    let conn = open_db_in_memory().unwrap();
    let service = calling::<FakeSuggestions>(&conn, None);
    let missing = Uuid::new_v4();

    let err = service.draft_script(missing).unwrap_err();
    assert!(matches!(err, CallingServiceError::ContactNotFound(id) if id == missing));
    assert!(service.history(missing, None).is_err());
}

#[test]
fn history_lists_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let mut service = calling::<FakeSuggestions>(&conn, None);
    let (_, y, _) = seed_xyz(&conn, &mut service);
    service.record_call(y, None).unwrap();

    let history = service.history(y, None).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].created_at > history[1].created_at);
    assert_eq!(history[1].note.as_deref(), Some("sent brochure"));

    let contacts = SqliteContactRepository::try_new(&conn)
        .unwrap()
        .list_contacts()
        .unwrap();
    let cached = contacts.iter().find(|contact| contact.id == y).unwrap();
    assert_eq!(cached.last_engaged_at, Some(history[0].created_at));
}
