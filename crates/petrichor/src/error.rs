/// Errors raised by domain operations.
///
/// Storage and transport failures travel as `anyhow::Error` instead; these
/// variants are the outcomes a caller is expected to branch on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    InvalidDirection,
    LinkSelf,
    ExitIdNotFound,
    ListingRooms,
    NoDefinition,
    InvalidType,
    InvalidInput,
    NextStatusForbidden,
    MissingField,
    CurrentActorImage,
    NotFound(&'static str),
    Forbidden,
    Conflict,
    InvalidCredentials,
    TooManyEmails,
    TooManyOpenApplications,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidDirection => write!(f, "invalid direction"),
            Error::LinkSelf => write!(f, "cannot link a room to itself"),
            Error::ExitIdNotFound => write!(f, "no exit found for that RID"),
            Error::ListingRooms => write!(f, "error listing rooms from database"),
            Error::NoDefinition => write!(f, "no definition with type"),
            Error::InvalidType => write!(f, "invalid type"),
            Error::InvalidInput => write!(f, "invalid input"),
            Error::NextStatusForbidden => write!(f, "next status forbidden"),
            Error::MissingField => write!(f, "a field is missing"),
            Error::CurrentActorImage => write!(f, "player already has a current character"),
            Error::NotFound(what) => write!(f, "{what} not found"),
            Error::Forbidden => write!(f, "forbidden"),
            Error::Conflict => write!(f, "conflict"),
            Error::InvalidCredentials => write!(f, "invalid username or password"),
            Error::TooManyEmails => write!(f, "too many emails"),
            Error::TooManyOpenApplications => write!(f, "too many open character applications"),
        }
    }
}

impl std::error::Error for Error {}
