use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use common::{ClientConfig, ClientError, CredentialStore, FileCredentialStore, Role};
use portal::{
    Access, ApprovalAction, AuthService, CaptureQueue, FaceApprovals, FileFrameSource, Gateway,
    HttpTransport, LoginForm, QUORUM, SessionController, SessionState, VerificationLoop,
    Workspace, authorize, guard::LOGIN_PATH, models::OfferingId,
};

const USAGE: &str = "usage: portal <command>

commands:
  login <role> <username>      sign in (password from ATTENDANCE_PASSWORD)
  password                     change password (ATTENDANCE_PASSWORD, ATTENDANCE_NEW_PASSWORD)
  logout                       sign out
  whoami                       show the signed-in user
  offerings                    list the teacher's course offerings
  session <offering>           show the session state and ledger of an offering
  start <offering>             start a session
  end <offering>               end the active session
  verify <offering> <image>... verify face images against the active session
  enroll <image> <image> <image>
                               submit face samples for the signed-in student
  approvals                    list pending face update requests
  approve <id> | reject <id>   decide on a face update request";

/// One invocation of the client
#[derive(Debug)]
enum Command {
    Login { role: Role, username: String },
    Password,
    Logout,
    WhoAmI,
    Offerings,
    Session(OfferingId),
    Start(OfferingId),
    End(OfferingId),
    Verify { offering: OfferingId, images: Vec<String> },
    Enroll(Vec<String>),
    Approvals,
    Decide { id: i64, action: ApprovalAction },
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let command = match args.as_slice() {
            ["login", role, username] => Command::Login {
                role: Role::parse(role).with_context(|| format!("unknown role: {}", role))?,
                username: username.to_string(),
            },
            ["password"] => Command::Password,
            ["logout"] => Command::Logout,
            ["whoami"] => Command::WhoAmI,
            ["offerings"] => Command::Offerings,
            ["session", offering] => Command::Session(parse_id(offering)?),
            ["start", offering] => Command::Start(parse_id(offering)?),
            ["end", offering] => Command::End(parse_id(offering)?),
            ["verify", offering, images @ ..] if !images.is_empty() => Command::Verify {
                offering: parse_id(offering)?,
                images: images.iter().map(|image| image.to_string()).collect(),
            },
            ["enroll", images @ ..] if images.len() == QUORUM => {
                Command::Enroll(images.iter().map(|image| image.to_string()).collect())
            }
            ["approvals"] => Command::Approvals,
            ["approve", id] => Command::Decide {
                id: parse_id(id)?,
                action: ApprovalAction::Approve,
            },
            ["reject", id] => Command::Decide {
                id: parse_id(id)?,
                action: ApprovalAction::Reject,
            },
            _ => bail!(USAGE),
        };
        Ok(command)
    }
}

fn parse_id(value: &str) -> Result<i64> {
    value
        .parse()
        .with_context(|| format!("expected a numeric id, got {}", value))
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{} is not set", name))
}

/// Wired client components sharing one gateway
struct Portal {
    gateway: Gateway,
}

impl Portal {
    fn store(&self) -> &dyn CredentialStore {
        self.gateway.store().as_ref()
    }

    fn enter(&self, workspace: Workspace) -> Result<()> {
        match authorize(self.store(), workspace) {
            Access::Granted(credential) => {
                info!("{} entered {}", credential.display_name, workspace.path());
                Ok(())
            }
            Access::Redirect(path) => bail!(
                "Sign in with a {} account first (redirected to {})",
                workspace.role(),
                path
            ),
        }
    }

    async fn desk(&self, offering: OfferingId) -> Result<Arc<SessionController>> {
        self.enter(Workspace::Teacher)?;
        let desk = Arc::new(SessionController::new(self.gateway.clone()));
        desk.resolve_for_selection(offering).await;
        Ok(desk)
    }

    async fn run(&self, command: Command) -> Result<()> {
        let auth = AuthService::new(self.gateway.clone());

        match command {
            Command::Login { role, username } => {
                let form = LoginForm {
                    username,
                    password: env_var("ATTENDANCE_PASSWORD")?,
                    scope: role,
                };
                let workspace = auth.login(&form).await?;
                println!("Signed in, continue at {}", workspace.path());
                if auth.current().is_some_and(|credential| credential.must_change_password) {
                    println!("A password change is required before continuing.");
                }
            }
            Command::Password => {
                let new_password = env_var("ATTENDANCE_NEW_PASSWORD")?;
                let message = auth
                    .change_password(&env_var("ATTENDANCE_PASSWORD")?, &new_password, &new_password)
                    .await?;
                println!("{}", message);
            }
            Command::Logout => {
                if auth.logout() {
                    println!("Signed out");
                } else {
                    println!("Not signed in");
                }
            }
            Command::WhoAmI => match auth.current() {
                Some(credential) => println!("{} ({})", credential.display_name, credential.role),
                None => println!("Not signed in"),
            },
            Command::Offerings => {
                self.enter(Workspace::Teacher)?;
                let desk = SessionController::new(self.gateway.clone());
                for offering in desk.load_offerings().await? {
                    println!(
                        "{:>4}  {} {} ({}){}",
                        offering.id,
                        offering.course_code,
                        offering.course_name,
                        offering.term,
                        if offering.active { "" } else { " [inactive]" }
                    );
                }
            }
            Command::Session(offering) => {
                let desk = self.desk(offering).await?;
                print_desk(&desk).await;
            }
            Command::Start(offering) => {
                let desk = self.desk(offering).await?;
                let result = desk.start().await;
                print_desk(&desk).await;
                result?;
            }
            Command::End(offering) => {
                let desk = self.desk(offering).await?;
                let result = desk.end().await;
                print_desk(&desk).await;
                result?;
            }
            Command::Verify { offering, images } => {
                let desk = self.desk(offering).await?;
                if desk.session_state().await == SessionState::NoSession {
                    bail!("Offering {} has no active session", offering);
                }
                let source = FileFrameSource::open(images.as_slice())?;
                let verifier = VerificationLoop::new(self.gateway.clone(), desk.clone());
                while source.remaining() > 0 {
                    match verifier.capture_and_verify(&source).await {
                        Ok(_) => {}
                        Err(e) if e.is_local() || e == ClientError::Unauthorized => {
                            return Err(e.into());
                        }
                        Err(e) => warn!("Verification failed: {}", e),
                    }
                    if let Some(feedback) = desk.view().await.feedback {
                        println!("{}", feedback);
                    }
                }
                print_desk(&desk).await;
            }
            Command::Enroll(images) => {
                self.enter(Workspace::Student)?;
                let source = FileFrameSource::open(images.as_slice())?;
                let queue = CaptureQueue::new(self.gateway.clone());
                while queue.capture_from(&source).is_some() {
                    println!("Captured {}", queue.progress());
                }
                let result = queue.submit().await;
                if let Some(status) = queue.status() {
                    println!("{}", status);
                }
                result?;
                if let Some(enrollment) = queue.enrollment() {
                    println!(
                        "Enrolled: {} ({} sample(s))",
                        enrollment.enrolled, enrollment.samples
                    );
                }
            }
            Command::Approvals => {
                self.enter(Workspace::Admin)?;
                let approvals = FaceApprovals::new(self.gateway.clone());
                let pending = approvals.list_pending().await?;
                if pending.is_empty() {
                    println!("No pending approvals");
                }
                for request in pending {
                    println!(
                        "{:>4}  {} <{}>  requested {}",
                        request.id,
                        request.user_name,
                        request.user_email,
                        request.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
            Command::Decide { id, action } => {
                self.enter(Workspace::Admin)?;
                let approvals = FaceApprovals::new(self.gateway.clone());
                let result = approvals.decide(id, action).await;
                if let Some(status) = approvals.status() {
                    println!("{}", status);
                }
                result?;
            }
        }

        Ok(())
    }
}

async fn print_desk(desk: &SessionController) {
    let view = desk.view().await;
    match view.session {
        SessionState::Active(id) => println!("Session {} active", id),
        SessionState::NoSession => println!("No active session"),
    }
    if let Some(notice) = &view.notice {
        println!("{}", notice);
    }
    for record in &view.ledger {
        println!(
            "  {:<10} {:<24} {:?}  {}{}",
            record.student_id,
            record.student_name,
            record.status,
            record.detected_at.format("%H:%M:%S"),
            record
                .confidence
                .map(|confidence| format!("  {:.2}", confidence))
                .unwrap_or_default()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let config = ClientConfig::from_env()?;
    info!("Using attendance service at {}", config.api_url);

    let store: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::open(config.credential_path.clone())?);
    let transport = Arc::new(HttpTransport::new(&config)?);
    let gateway = Gateway::new(transport, store).with_logout_hook(Arc::new(|| {
        warn!("Signed out by the service, redirecting to {}", LOGIN_PATH);
    }));

    Portal { gateway }.run(command).await
}
