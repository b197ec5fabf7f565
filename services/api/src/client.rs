use agazh::client::{
    ApiClient, ClientError, FileSessionStore, HiringStatusController, HiringView, ReviewOutcome,
    Session, TransitionOutcome, UserAlert,
};
use agazh::config::AppConfig;
use agazh::error::AppError;
use agazh::marketplace::domain::LoginCredentials;
use agazh::marketplace::{
    Category, EmploymentType, HiringAction, HiringId, Housekeeper, HousekeeperFilter, UserType,
};
use agazh::telemetry::{self, LogSink};
use clap::{Args, Subcommand};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Subcommand, Debug)]
pub(crate) enum ClientCommand {
    /// Log in and store the session locally
    Login(LoginArgs),
    /// Forget the stored session
    Logout,
    /// Show who the stored session belongs to
    Whoami,
    /// Browse available housekeepers
    Housekeepers(ListingArgs),
    /// Inspect or move a hiring request
    #[command(subcommand)]
    Hiring(HiringCommand),
    /// Review the housekeeper of a completed hiring
    Review(ReviewArgs),
}

#[derive(Args, Debug)]
pub(crate) struct LoginArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) password: String,
    /// housekeeper or employer
    #[arg(long, value_parser = parse_user_type)]
    pub(crate) user_type: UserType,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ListingArgs {
    /// NORMAL, CHILD_CARE or CLEANER
    #[arg(long, value_parser = parse_category)]
    pub(crate) category: Option<Category>,
    /// FULL_TIME or PART_TIME
    #[arg(long, value_parser = parse_employment_type)]
    pub(crate) employment_type: Option<EmploymentType>,
    #[arg(long)]
    pub(crate) location: Option<String>,
    /// Text to look for in names, locations and skills
    #[arg(long)]
    pub(crate) search: Option<String>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum HiringCommand {
    /// Show status, badge and offered actions
    Show { id: String },
    Approve { id: String },
    Reject { id: String },
    /// Mark the hiring completed
    Complete { id: String },
}

#[derive(Args, Debug)]
pub(crate) struct ReviewArgs {
    pub(crate) hiring_id: String,
    /// Stars from 1 to 5
    #[arg(long)]
    pub(crate) rating: u8,
    #[arg(long)]
    pub(crate) comment: Option<String>,
}

pub(crate) async fn run_client(command: ClientCommand) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_with_sink(&config.telemetry, LogSink::Stderr)?;

    let store = FileSessionStore::new(config.client.session_path.clone());
    let session = Arc::new(Session::init(Arc::new(store))?);
    let api = Arc::new(ApiClient::new(&config.client, session)?);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match command {
        ClientCommand::Login(args) => login(&api, args, &cancel).await,
        ClientCommand::Logout => {
            api.logout()?;
            println!("Logged out");
            Ok(())
        }
        ClientCommand::Whoami => {
            println!("{}", describe_session(&api));
            Ok(())
        }
        ClientCommand::Housekeepers(args) => list_housekeepers(&api, args, &cancel).await,
        ClientCommand::Hiring(command) => hiring(api, command, cancel).await,
        ClientCommand::Review(args) => review(api, args, cancel).await,
    }
}

async fn login(
    api: &ApiClient,
    args: LoginArgs,
    cancel: &CancellationToken,
) -> Result<(), AppError> {
    let credentials = LoginCredentials {
        email: args.email,
        password: args.password,
        user_type: args.user_type,
    };
    match api.login(&credentials, cancel).await {
        Ok(snapshot) => {
            println!(
                "Logged in as {} {}",
                snapshot.user_type.label(),
                snapshot.user_info.user_id
            );
            Ok(())
        }
        Err(err) => Err(alert_or_error(err, "Login failed")),
    }
}

fn describe_session(api: &ApiClient) -> String {
    match api.session().current() {
        Some(snapshot) => format!(
            "{} {} (token expires at unix time {})",
            snapshot.user_type.label(),
            snapshot.user_info.user_id,
            snapshot.user_info.exp
        ),
        None => "Not logged in".to_string(),
    }
}

async fn list_housekeepers(
    api: &ApiClient,
    args: ListingArgs,
    cancel: &CancellationToken,
) -> Result<(), AppError> {
    let filter = HousekeeperFilter {
        category: args.category,
        employment_type: args.employment_type,
        location: args.location,
        search: args.search,
    };
    let housekeepers = api
        .list_housekeepers(&filter, cancel)
        .await
        .map_err(|err| alert_or_error(err, "Failed to fetch housekeepers"))?;

    if housekeepers.is_empty() {
        println!("No housekeepers match the filter");
    }
    for housekeeper in &housekeepers {
        println!("{}", housekeeper_line(housekeeper));
    }
    Ok(())
}

fn housekeeper_line(housekeeper: &Housekeeper) -> String {
    format!(
        "{id}  {name:<20} {category:<10} {employment:<9} {location:<15} {rating:.1}★  {years}y",
        id = housekeeper.id,
        name = housekeeper.name,
        category = housekeeper.category.label(),
        employment = housekeeper.employment_type.label(),
        location = housekeeper.location,
        rating = housekeeper.rating,
        years = housekeeper.experience,
    )
}

async fn hiring(
    api: Arc<ApiClient>,
    command: HiringCommand,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    let (id, action) = match command {
        HiringCommand::Show { id } => (id, None),
        HiringCommand::Approve { id } => (id, Some(HiringAction::Approve)),
        HiringCommand::Reject { id } => (id, Some(HiringAction::Reject)),
        HiringCommand::Complete { id } => (id, Some(HiringAction::MarkCompleted)),
    };

    let mut controller = HiringStatusController::with_cancellation(api, cancel);
    load_view(&mut controller, &HiringId(id)).await?;

    let Some(action) = action else {
        if let Some(view) = controller.view() {
            print_view(view);
        }
        return Ok(());
    };

    match controller.transition(action).await {
        TransitionOutcome::Applied(status) => {
            println!("Hiring status is now {}", status.label());
            if let Some(view) = controller.view() {
                print_actions(view);
            }
            Ok(())
        }
        TransitionOutcome::Failed(alert) => Err(AppError::Rejected(alert)),
        TransitionOutcome::Cancelled => Err(AppError::Client(ClientError::Cancelled)),
        TransitionOutcome::NotOffered => {
            let status = controller
                .view()
                .map(|view| view.status().label())
                .unwrap_or("unknown");
            Err(AppError::Rejected(UserAlert::error(format!(
                "{} is not offered while the hiring is {}",
                action.label(),
                status
            ))))
        }
    }
}

async fn load_view(
    controller: &mut HiringStatusController<ApiClient>,
    id: &HiringId,
) -> Result<(), AppError> {
    let loaded = controller.load(id).await.map(|_| ());
    match loaded {
        Ok(()) => Ok(()),
        Err(ClientError::Cancelled) => Err(AppError::Client(ClientError::Cancelled)),
        Err(err) => Err(controller
            .take_alert()
            .map(AppError::Rejected)
            .unwrap_or(AppError::Client(err))),
    }
}

async fn review(
    api: Arc<ApiClient>,
    args: ReviewArgs,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    let mut controller = HiringStatusController::with_cancellation(api.clone(), cancel.clone());
    load_view(&mut controller, &HiringId(args.hiring_id)).await?;

    let mut draft = controller.review_draft().ok_or_else(|| {
        AppError::Rejected(UserAlert::error(
            "Reviews can only be written for completed hirings",
        ))
    })?;
    draft.set_rating(args.rating);
    if let Some(comment) = args.comment {
        draft.set_comment(comment);
    }

    match draft.submit(api.as_ref(), &cancel).await {
        ReviewOutcome::Submitted(id) => {
            println!("Review {id} submitted for {}", draft.housekeeper_name());
            Ok(())
        }
        ReviewOutcome::Rejected(alert) => Err(AppError::Rejected(alert)),
        ReviewOutcome::Cancelled => Err(AppError::Client(ClientError::Cancelled)),
    }
}

fn print_view(view: &HiringView) {
    let appearance = view.appearance();
    println!("Hiring {}", view.hiring.id);
    println!(
        "  Status:       {} ({}, {})",
        view.status().label(),
        appearance.color,
        appearance.icon
    );
    println!("  Housekeeper:  {}", view.housekeeper.name);
    println!("  Salary offer: {:.2}", view.hiring.salary_offer);
    println!("  Start date:   {}", view.hiring.start_date.format("%Y-%m-%d"));
    println!("  Delivery:     {}", view.hiring.delivery_type.label());
    if !view.hiring.requirements.is_empty() {
        println!("  Requirements: {}", view.hiring.requirements);
    }
    print_actions(view);
}

fn print_actions(view: &HiringView) {
    let labels: Vec<&str> = view.actions().into_iter().map(HiringAction::label).collect();
    println!("  Actions:      {}", labels.join(", "));
}

/// Server message as an alert when there is one, the fallback alert for other
/// server or transport failures, and the raw error for everything else.
fn alert_or_error(err: ClientError, fallback: &str) -> AppError {
    match err {
        ClientError::Server { .. } | ClientError::Transport(_) => {
            AppError::Rejected(UserAlert::for_failure(&err, fallback))
        }
        other => AppError::Client(other),
    }
}

fn parse_user_type(raw: &str) -> Result<UserType, String> {
    UserType::parse(raw).ok_or_else(|| format!("'{raw}' is not housekeeper or employer"))
}

fn parse_wire_enum<T: DeserializeOwned>(raw: &str, expected: &str) -> Result<T, String> {
    let normalized = raw.trim().to_ascii_uppercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|_| format!("'{raw}' is not one of {expected}"))
}

fn parse_category(raw: &str) -> Result<Category, String> {
    parse_wire_enum(raw, "NORMAL, CHILD_CARE, CLEANER")
}

fn parse_employment_type(raw: &str) -> Result<EmploymentType, String> {
    parse_wire_enum(raw, "FULL_TIME, PART_TIME")
}
