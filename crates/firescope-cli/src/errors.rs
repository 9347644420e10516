use console::style;
use firescope_core::FirescopeError;
use std::fmt;

/// Enhanced error type with suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Create error for database connection failure
pub fn database_connection_failed(error: &str) -> CliError {
    CliError::new("Cannot connect to PostgreSQL")
        .with_context(format!("DATABASE_URL is not set or connection failed.\n\nError: {}", error))
        .with_suggestion("Set DATABASE_URL: export DATABASE_URL=\"postgresql://localhost/firescope\"")
        .with_suggestion("Check that the PostGIS extension is available on the server")
        .with_help("Run: firescope config")
}

/// Create error for a command that needs the PostgreSQL backend
pub fn postgres_required(command: &str) -> CliError {
    CliError::new(format!("'{}' needs the PostgreSQL backend", command))
        .with_context("Bounded extracts are materialized as database tables.")
        .with_suggestion(format!("Re-run with --storage postgres: firescope --storage postgres {}", command))
        .with_help(format!("Run: firescope {} --help", command))
}

/// Create error for a table name used with in-memory storage
pub fn table_needs_postgres(table: &str) -> CliError {
    CliError::new(format!("Table {} is not available in memory storage", table))
        .with_context("In-memory storage only holds feature sets read from files.")
        .with_suggestion("Pass a feature-set file instead of --table")
        .with_suggestion("Or use --storage postgres to work on a database table")
}

/// Create error for missing input file
pub fn input_not_found(path: &str) -> CliError {
    CliError::new("Feature-set file not found")
        .with_context(format!("The specified file does not exist.\n\nPath: {}", path))
        .with_suggestion("Check the file path and try again")
        .with_suggestion("Use absolute path or path relative to current directory")
}

/// Create error for invalid configuration
pub fn invalid_config(key: &str, reason: &str) -> CliError {
    CliError::new(format!("Invalid configuration: {}", key))
        .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
        .with_suggestion("Check the file passed with --config for syntax errors")
        .with_suggestion("Check FIRESCOPE_* environment variables")
        .with_help("Run: firescope config")
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    let error = match error.downcast::<CliError>() {
        Ok(cli_error) => return cli_error,
        Err(error) => error,
    };

    let message = format!("{:#}", error);
    match error.downcast_ref::<FirescopeError>() {
        Some(FirescopeError::ConfigInvalid { key, reason }) => return invalid_config(key, reason),
        Some(FirescopeError::InvalidTolerance { key, value }) => {
            return invalid_config(key, &format!("{} must be a positive number", value))
        }
        _ => {}
    }

    // Try to provide context based on error message
    if message.contains("No such file or directory") {
        CliError::new("File not found")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check the file path and try again")
    } else if message.contains("Connection refused")
        || message.contains("DATABASE_URL")
        || message.contains("pool timed out")
    {
        database_connection_failed(&message)
    } else if message.contains("permission denied") {
        CliError::new("Permission denied")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check file permissions")
            .with_suggestion("Or run with appropriate privileges")
    } else {
        CliError::new(message)
    }
}
