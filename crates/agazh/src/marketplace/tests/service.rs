use super::common::*;
use std::sync::Arc;
use std::thread;

use chrono::Utc;

use crate::marketplace::auth::TokenIssuer;
use crate::marketplace::domain::{
    Category, EmployerUpdate, HiringStatus, HiringStatusUpdate, HousekeeperFilter,
    HousekeeperId, HousekeeperUpdate, LoginCredentials, NewReview, Review, ReviewId, UserType,
};
use crate::marketplace::memory::{InMemoryMarketplaceRepository, RecordingNotifier};
use crate::marketplace::repository::{MarketplaceRepository, RepositoryError};
use crate::marketplace::service::{Caller, MarketplaceError, MarketplaceService};

fn status_update(status: HiringStatus) -> HiringStatusUpdate {
    HiringStatusUpdate {
        status,
        expected_status: None,
    }
}

#[test]
fn login_issues_token_for_registered_account() {
    let (service, _, _) = build_service();
    let parties = register_parties(&service);

    let token = service
        .login(LoginCredentials {
            email: "DAWIT@example.com".to_string(),
            password: "s3cret-pass".to_string(),
            user_type: UserType::Employer,
        })
        .expect("login succeeds");

    let claims = service.tokens().verify(&token).expect("token verifies");
    assert_eq!(claims.user_id, parties.employer_id.0);
    assert_eq!(claims.user_type, UserType::Employer);
}

#[test]
fn login_rejects_wrong_password_and_wrong_account_kind() {
    let (service, _, _) = build_service();
    register_parties(&service);

    let wrong_password = service.login(LoginCredentials {
        email: "tigist@example.com".to_string(),
        password: "not-it".to_string(),
        user_type: UserType::Housekeeper,
    });
    assert!(matches!(wrong_password, Err(MarketplaceError::InvalidCredentials)));

    let wrong_kind = service.login(LoginCredentials {
        email: "tigist@example.com".to_string(),
        password: "s3cret-pass".to_string(),
        user_type: UserType::Employer,
    });
    assert!(matches!(wrong_kind, Err(MarketplaceError::InvalidCredentials)));
}

#[test]
fn duplicate_email_is_rejected_case_insensitively() {
    let (service, _, _) = build_service();
    register_parties(&service);

    let result = service.register_housekeeper(housekeeper_registration(
        "Someone Else",
        "Tigist@Example.com",
    ));
    assert!(matches!(result, Err(MarketplaceError::DuplicateAccount)));
}

#[test]
fn registration_reports_every_invalid_field() {
    let (service, _, _) = build_service();
    let mut registration = housekeeper_registration("", "not-an-email");
    registration.password = "123".to_string();

    match service.register_housekeeper(registration) {
        Err(MarketplaceError::Validation(message)) => {
            assert!(message.contains("email must be a valid address"));
            assert!(message.contains("name is required"));
            assert!(message.contains("password must be at least 6 characters"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn listing_filters_and_orders_by_rating() {
    let (service, repository, _) = build_service();
    let parties = register_parties(&service);

    let mut nanny = housekeeper_registration("Hana", "hana@example.com");
    nanny.category = Category::ChildCare;
    nanny.location = "Hawassa".to_string();
    let nanny_id = service.register_housekeeper(nanny).expect("registers");

    repository
        .record_review(Review {
            id: ReviewId::generate(),
            employer_id: parties.employer_id.clone(),
            housekeeper_id: nanny_id.clone(),
            rating: 5,
            comment: String::new(),
            created_at: Utc::now(),
        })
        .expect("records");

    let everyone = service
        .list_housekeepers(&HousekeeperFilter::default())
        .expect("lists");
    assert_eq!(everyone.len(), 2);
    assert_eq!(everyone[0].id, nanny_id);
    assert_eq!(everyone[1].id, parties.housekeeper_id);

    let cleaners = service
        .list_housekeepers(&HousekeeperFilter {
            category: Some(Category::Cleaner),
            ..HousekeeperFilter::default()
        })
        .expect("lists");
    assert_eq!(cleaners.len(), 1);
    assert_eq!(cleaners[0].id, parties.housekeeper_id);

    let in_hawassa = service
        .list_housekeepers(&HousekeeperFilter {
            location: Some("Hawassa".to_string()),
            ..HousekeeperFilter::default()
        })
        .expect("lists");
    assert_eq!(in_hawassa.len(), 1);
    assert_eq!(in_hawassa[0].id, nanny_id);

    let search = |term: &str| {
        service
            .list_housekeepers(&HousekeeperFilter {
                search: Some(term.to_string()),
                ..HousekeeperFilter::default()
            })
            .expect("lists")
    };
    let by_name = search("tIGi");
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].id, parties.housekeeper_id);
    assert_eq!(search("hawassa")[0].id, nanny_id);
    assert_eq!(search("LAUNDRY").len(), 2);
    assert!(search("gardening").is_empty());
}

#[test]
fn housekeeper_can_toggle_own_availability_only() {
    let (service, _, _) = build_service();
    let parties = register_parties(&service);
    let unavailable = HousekeeperUpdate {
        is_available: Some(false),
        ..HousekeeperUpdate::default()
    };

    let forbidden =
        service.update_housekeeper(&parties.employer(), &parties.housekeeper_id, unavailable.clone());
    assert!(matches!(forbidden, Err(MarketplaceError::Forbidden(_))));

    let profile = service
        .update_housekeeper(&parties.housekeeper(), &parties.housekeeper_id, unavailable)
        .expect("owner updates");
    assert!(!profile.is_available);

    let listed = service
        .list_housekeepers(&HousekeeperFilter::default())
        .expect("lists");
    assert!(listed.is_empty());
}

#[test]
fn deleting_a_profile_removes_it() {
    let (service, _, _) = build_service();
    let parties = register_parties(&service);

    service
        .delete_housekeeper(&parties.housekeeper(), &parties.housekeeper_id)
        .expect("owner deletes");

    assert!(matches!(
        service.housekeeper(&parties.housekeeper_id),
        Err(MarketplaceError::NotFound("Housekeeper not found"))
    ));
}

#[test]
fn employer_updates_own_profile() {
    let (service, _, _) = build_service();
    let parties = register_parties(&service);

    let updated = service
        .update_employer(
            &parties.employer(),
            &parties.employer_id,
            EmployerUpdate {
                family_size: Some(6),
                address: Some("Kazanchis".to_string()),
                ..EmployerUpdate::default()
            },
        )
        .expect("owner updates");
    assert_eq!(updated.family_size, 6);
    assert_eq!(
        service.employer(&parties.employer_id).expect("found").address,
        "Kazanchis"
    );

    let stranger = Caller::new("someone-else", UserType::Employer);
    assert!(matches!(
        service.update_employer(&stranger, &parties.employer_id, EmployerUpdate::default()),
        Err(MarketplaceError::Forbidden(_))
    ));
}

#[test]
fn new_hiring_starts_pending_and_notifies() {
    let (service, _, notifier) = build_service();
    let parties = register_parties(&service);

    let hiring = pending_hiring(&service, &parties);

    assert_eq!(hiring.status, HiringStatus::Pending);
    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].hiring.id, hiring.id);
    assert_eq!(notices[0].subject(), "New Hiring Request");
    assert!(notices[0].body().contains("Name: Tigist"));
    assert!(notices[0].body().contains("Salary offered: $4500.00"));
}

#[test]
fn hiring_creation_checks_caller_and_references() {
    let (service, _, _) = build_service();
    let parties = register_parties(&service);

    let by_housekeeper = service.create_hiring(
        &parties.housekeeper(),
        hiring_request(&parties.employer_id, &parties.housekeeper_id),
    );
    assert!(matches!(by_housekeeper, Err(MarketplaceError::Forbidden(_))));

    let missing = HousekeeperId::from("missing");
    let unknown = service.create_hiring(
        &parties.employer(),
        hiring_request(&parties.employer_id, &missing),
    );
    assert!(matches!(
        unknown,
        Err(MarketplaceError::UnknownReference("Housekeeper not found"))
    ));

    let mut free = hiring_request(&parties.employer_id, &parties.housekeeper_id);
    free.salary_offer = 0.0;
    assert!(matches!(
        service.create_hiring(&parties.employer(), free),
        Err(MarketplaceError::Validation(_))
    ));
}

#[test]
fn notification_failure_keeps_the_hiring() {
    let repository = InMemoryMarketplaceRepository::default();
    let service = MarketplaceService::new(
        Arc::new(repository.clone()),
        Arc::new(FailingNotifier),
        TokenIssuer::new(&auth_config()),
    );
    let housekeeper_id = service
        .register_housekeeper(housekeeper_registration("Tigist", "tigist@example.com"))
        .expect("registers");
    let employer_id = service
        .register_employer(employer_registration("Dawit", "dawit@example.com"))
        .expect("registers");
    let employer = Caller::new(employer_id.as_str(), UserType::Employer);

    let hiring = service
        .create_hiring(&employer, hiring_request(&employer_id, &housekeeper_id))
        .expect("hiring survives notifier failure");

    assert_eq!(service.hiring(&hiring.id).expect("stored").id, hiring.id);
}

#[test]
fn status_moves_follow_the_lifecycle() {
    let (service, _, _) = build_service();
    let parties = register_parties(&service);
    let hiring = pending_hiring(&service, &parties);

    let approved = service
        .update_hiring_status(
            &parties.housekeeper(),
            &hiring.id,
            status_update(HiringStatus::Approved),
        )
        .expect("approves");
    assert_eq!(approved.status, HiringStatus::Approved);

    let back = service.update_hiring_status(
        &parties.employer(),
        &hiring.id,
        status_update(HiringStatus::Rejected),
    );
    assert!(matches!(
        back,
        Err(MarketplaceError::IllegalTransition {
            from: HiringStatus::Approved,
            to: HiringStatus::Rejected,
        })
    ));

    let completed = service
        .update_hiring_status(
            &parties.employer(),
            &hiring.id,
            status_update(HiringStatus::Completed),
        )
        .expect("completes");
    assert_eq!(completed.status, HiringStatus::Completed);

    let reopened = service.update_hiring_status(
        &parties.employer(),
        &hiring.id,
        status_update(HiringStatus::Pending),
    );
    assert!(matches!(reopened, Err(MarketplaceError::IllegalTransition { .. })));
}

#[test]
fn repeated_status_request_is_a_no_op() {
    let (service, _, _) = build_service();
    let parties = register_parties(&service);
    let hiring = pending_hiring(&service, &parties);
    let approve = HiringStatusUpdate {
        status: HiringStatus::Approved,
        expected_status: Some(HiringStatus::Pending),
    };

    let first = service
        .update_hiring_status(&parties.housekeeper(), &hiring.id, approve)
        .expect("approves");
    let second = service
        .update_hiring_status(&parties.housekeeper(), &hiring.id, approve)
        .expect("repeat is accepted");

    assert_eq!(first.status, HiringStatus::Approved);
    assert_eq!(second.status, HiringStatus::Approved);
    assert_eq!(second.updated_at, first.updated_at);
}

#[test]
fn stale_expected_status_is_a_precondition_failure() {
    let (service, _, _) = build_service();
    let parties = register_parties(&service);
    let hiring = pending_hiring(&service, &parties);

    service
        .update_hiring_status(
            &parties.housekeeper(),
            &hiring.id,
            status_update(HiringStatus::Rejected),
        )
        .expect("rejects");

    let stale = service.update_hiring_status(
        &parties.employer(),
        &hiring.id,
        HiringStatusUpdate {
            status: HiringStatus::Approved,
            expected_status: Some(HiringStatus::Pending),
        },
    );
    assert!(matches!(
        stale,
        Err(MarketplaceError::StatusPreconditionFailed {
            expected: HiringStatus::Pending,
            actual: HiringStatus::Rejected,
        })
    ));
}

#[test]
fn concurrent_status_changes_from_the_same_snapshot_admit_one_winner() {
    let (service, repository, _) = build_service();
    let parties = register_parties(&service);
    let hiring = pending_hiring(&service, &parties);
    let racing = MarketplaceService::new(
        Arc::new(LockstepReads::new(repository.clone(), 2)),
        Arc::new(RecordingNotifier::default()),
        TokenIssuer::new(&auth_config()),
    );
    let from_pending = |status| HiringStatusUpdate {
        status,
        expected_status: Some(HiringStatus::Pending),
    };

    let (completed, approved) = thread::scope(|scope| {
        let completing = scope.spawn(|| {
            racing.update_hiring_status(
                &parties.housekeeper(),
                &hiring.id,
                from_pending(HiringStatus::Completed),
            )
        });
        let approving = scope.spawn(|| {
            racing.update_hiring_status(
                &parties.employer(),
                &hiring.id,
                from_pending(HiringStatus::Approved),
            )
        });
        (
            completing.join().expect("thread finishes"),
            approving.join().expect("thread finishes"),
        )
    });

    let stored = repository
        .fetch_hiring(&hiring.id)
        .expect("repository reachable")
        .expect("stored");
    match (completed, approved) {
        (Ok(winner), Err(MarketplaceError::StatusPreconditionFailed { expected, actual }))
        | (Err(MarketplaceError::StatusPreconditionFailed { expected, actual }), Ok(winner)) => {
            assert_eq!(expected, HiringStatus::Pending);
            assert_eq!(actual, winner.status);
            assert_eq!(stored.status, winner.status);
        }
        other => panic!("expected exactly one winner, got {other:?}"),
    }
}

#[test]
fn outsiders_cannot_change_status() {
    let (service, _, _) = build_service();
    let parties = register_parties(&service);
    let hiring = pending_hiring(&service, &parties);
    let outsider = Caller::new("another-employer", UserType::Employer);

    let result =
        service.update_hiring_status(&outsider, &hiring.id, status_update(HiringStatus::Approved));
    assert!(matches!(result, Err(MarketplaceError::Forbidden(_))));
    assert_eq!(
        service.hiring(&hiring.id).expect("found").status,
        HiringStatus::Pending
    );
}

#[test]
fn review_requires_completed_hiring_and_updates_rating() {
    let (service, _, _) = build_service();
    let parties = register_parties(&service);
    let hiring = pending_hiring(&service, &parties);
    let review = |rating: u8| NewReview {
        employer_id: parties.employer_id.clone(),
        housekeeper_id: parties.housekeeper_id.clone(),
        rating,
        comment: "Reliable and kind".to_string(),
    };

    assert!(matches!(
        service.create_review(&parties.employer(), review(5)),
        Err(MarketplaceError::ReviewNotAllowed)
    ));

    service
        .update_hiring_status(
            &parties.employer(),
            &hiring.id,
            status_update(HiringStatus::Completed),
        )
        .expect("completes");

    service
        .create_review(&parties.employer(), review(5))
        .expect("review accepted");
    service
        .create_review(&parties.employer(), review(4))
        .expect("review accepted");

    let profile = service
        .housekeeper(&parties.housekeeper_id)
        .expect("found");
    assert!((profile.rating - 4.5).abs() < f64::EPSILON);
    assert_eq!(
        service
            .reviews_for_housekeeper(&parties.housekeeper_id)
            .expect("lists")
            .len(),
        2
    );

    assert!(matches!(
        service.create_review(&parties.employer(), review(6)),
        Err(MarketplaceError::Validation(_))
    ));
    assert!(matches!(
        service.create_review(&parties.housekeeper(), review(3)),
        Err(MarketplaceError::Forbidden(_))
    ));
}

#[test]
fn profile_edits_do_not_lose_concurrent_ratings() {
    let (service, _, _) = build_service();
    let parties = register_parties(&service);
    let hiring = pending_hiring(&service, &parties);
    service
        .update_hiring_status(
            &parties.employer(),
            &hiring.id,
            status_update(HiringStatus::Completed),
        )
        .expect("completes");
    let ratings: Vec<u8> = (0..20).map(|index| index % 5 + 1).collect();

    thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..50 {
                service
                    .update_housekeeper(
                        &parties.housekeeper(),
                        &parties.housekeeper_id,
                        HousekeeperUpdate {
                            is_available: Some(false),
                            ..HousekeeperUpdate::default()
                        },
                    )
                    .expect("owner updates");
            }
        });
        scope.spawn(|| {
            for rating in &ratings {
                service
                    .create_review(
                        &parties.employer(),
                        NewReview {
                            employer_id: parties.employer_id.clone(),
                            housekeeper_id: parties.housekeeper_id.clone(),
                            rating: *rating,
                            comment: String::new(),
                        },
                    )
                    .expect("review accepted");
            }
        });
    });

    let expected = ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / ratings.len() as f64;
    let profile = service
        .housekeeper(&parties.housekeeper_id)
        .expect("found");
    assert!((profile.rating - expected).abs() < 1e-9);
    assert!(!profile.is_available);
}

#[test]
fn stats_count_hirings_by_status() {
    let (service, _, _) = build_service();
    let parties = register_parties(&service);
    let first = pending_hiring(&service, &parties);
    pending_hiring(&service, &parties);
    service
        .update_hiring_status(
            &parties.employer(),
            &first.id,
            status_update(HiringStatus::Completed),
        )
        .expect("completes");

    let stats = service
        .housekeeper_stats(&parties.housekeeper_id)
        .expect("stats");
    assert_eq!(stats.total_hirings, 2);
    assert_eq!(stats.pending_hirings, 1);
    assert_eq!(stats.completed_hirings, 1);
    assert_eq!(stats.average_rating, 0.0);

    assert_eq!(
        service
            .hiring_history(&parties.employer_id)
            .expect("history")
            .len(),
        2
    );
}

#[test]
fn repository_outage_surfaces_as_repository_error() {
    let service = MarketplaceService::new(
        Arc::new(UnavailableRepository),
        Arc::new(RecordingNotifier::default()),
        TokenIssuer::new(&auth_config()),
    );

    match service.list_housekeepers(&HousekeeperFilter::default()) {
        Err(MarketplaceError::Repository(RepositoryError::Unavailable(reason))) => {
            assert_eq!(reason, "database offline");
        }
        other => panic!("expected repository outage, got {other:?}"),
    }
}
