use lms_session::models::user::{LoginRequest, RegisterRequest, UserRole};
use lms_session::service::navigation::HistoryNavigator;
use lms_session::service::notifier::TracingNotifier;
use lms_session::storage::FileStore;
use lms_session::{Config, SessionManager, init_tracing};
use std::sync::Arc;

#[derive(Debug, PartialEq)]
enum Command {
    Login { email: String, password: String, return_url: Option<String> },
    Register {
        email: String,
        password: String,
        name: String,
        role: UserRole,
        department: Option<String>,
        student_id: Option<String>,
    },
    Status,
    Logout,
    ShowConfig,
}

fn print_usage(bin_name: &str) {
    eprintln!("Usage: {bin_name} <command>");
    eprintln!("  login <email> <password> [return-url]");
    eprintln!("  register <email> <password> <name> <role> [department] [student-id]");
    eprintln!("  status");
    eprintln!("  logout");
    eprintln!("  config");
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["login", email, password] => Ok(Command::Login {
            email: email.to_string(),
            password: password.to_string(),
            return_url: None,
        }),
        ["login", email, password, return_url] => Ok(Command::Login {
            email: email.to_string(),
            password: password.to_string(),
            return_url: Some(return_url.to_string()),
        }),
        ["register", email, password, name, role, extra @ ..] if extra.len() <= 2 => Ok(Command::Register {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
            role: role.parse()?,
            department: extra.first().map(|v| v.to_string()),
            student_id: extra.get(1).map(|v| v.to_string()),
        }),
        ["status"] => Ok(Command::Status),
        ["logout"] => Ok(Command::Logout),
        ["config"] => Ok(Command::ShowConfig),
        _ => Err("unrecognized command".to_string()),
    }
}

fn print_status(manager: &SessionManager) -> i32 {
    match serde_json::to_string_pretty(&manager.snapshot()) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(err) => {
            eprintln!("Failed to render session state: {err}");
            1
        }
    }
}

async fn run(command: Command, config: &Config, manager: &SessionManager, navigator: &HistoryNavigator) -> i32 {
    match command {
        Command::Login { email, password, return_url } => {
            let request = LoginRequest { email, password, return_url };
            match manager.login(request).await {
                Ok(user) => {
                    println!(
                        "Logged in as {} ({}), redirected to {}",
                        user.name,
                        user.role,
                        navigator.current().unwrap_or_else(|| config.session.home_route.clone())
                    );
                    0
                }
                Err(err) => {
                    eprintln!("Login failed: {err}");
                    1
                }
            }
        }
        Command::Register {
            email,
            password,
            name,
            role,
            department,
            student_id,
        } => {
            let request = RegisterRequest {
                email,
                password,
                name,
                role,
                department,
                student_id,
            };
            match manager.register(request).await {
                Ok(user) => {
                    println!("Registered {} as {}", user.email, user.role);
                    0
                }
                Err(err) => {
                    eprintln!("Registration failed: {err}");
                    1
                }
            }
        }
        Command::Status => print_status(manager),
        Command::Logout => {
            manager.logout();
            println!("Logged out");
            0
        }
        Command::ShowConfig => match config.to_toml() {
            Ok(rendered) => {
                print!("{rendered}");
                0
            }
            Err(err) => {
                eprintln!("Failed to render configuration: {err}");
                1
            }
        },
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let mut args = std::env::args();
    let bin_name = args.next().unwrap_or_else(|| "lms_session".to_string());
    let rest: Vec<String> = args.collect();

    let command = match parse_command(&rest) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}");
            print_usage(&bin_name);
            std::process::exit(2);
        }
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level, config.logging.json_format);

    let store = Arc::new(FileStore::new(&config.storage.path));
    let navigator = Arc::new(HistoryNavigator::new());
    let manager = SessionManager::with_mock_gateway(config.session.clone(), store, Arc::new(TracingNotifier), navigator.clone());
    manager.restore_from_persisted_state();

    let code = run(command, &config, &manager, &navigator).await;

    manager.dispose();
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn parses_login_with_optional_return_url() {
        assert_eq!(
            parse_command(&args(&["login", "teacher@demo.com", "123456"])),
            Ok(Command::Login {
                email: "teacher@demo.com".to_string(),
                password: "123456".to_string(),
                return_url: None,
            })
        );
        assert!(matches!(
            parse_command(&args(&["login", "a@b.com", "pw", "/courses"])),
            Ok(Command::Login { return_url: Some(_), .. })
        ));
    }

    #[test]
    fn parses_register_role() {
        assert!(matches!(
            parse_command(&args(&["register", "a@b.com", "pw", "Ada", "instructor"])),
            Ok(Command::Register { role: UserRole::Teacher, .. })
        ));
        assert!(parse_command(&args(&["register", "a@b.com", "pw", "Ada", "janitor"])).is_err());
    }

    #[test]
    fn parses_register_optional_fields() {
        assert_eq!(
            parse_command(&args(&["register", "ada@school.org", "pw", "Ada", "student", "Mathematics", "STU-42"])),
            Ok(Command::Register {
                email: "ada@school.org".to_string(),
                password: "pw".to_string(),
                name: "Ada".to_string(),
                role: UserRole::Student,
                department: Some("Mathematics".to_string()),
                student_id: Some("STU-42".to_string()),
            })
        );
        assert!(matches!(
            parse_command(&args(&["register", "a@b.com", "pw", "Ada", "teacher", "Physics"])),
            Ok(Command::Register { department: Some(_), student_id: None, .. })
        ));
        assert!(parse_command(&args(&["register", "a@b.com", "pw", "Ada", "student", "x", "y", "z"])).is_err());
    }

    #[test]
    fn rejects_unknown_commands() {
        assert!(parse_command(&args(&[])).is_err());
        assert!(parse_command(&args(&["status", "extra"])).is_err());
        assert_eq!(parse_command(&args(&["logout"])), Ok(Command::Logout));
    }
}
