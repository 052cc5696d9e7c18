mod film;
mod review;
mod tmdb;
mod user;
mod watch_status;

pub use film::{Film, FilmSummary, FilmType, Genre, NewFilm};
pub use review::{RatingStats, Review, ReviewWithAuthor};
pub use tmdb::{parse_year, MediaType, TimeWindow, TmdbDetails, TmdbGenre, TmdbTitle};
pub use user::{NewUser, User, UserProfile};
pub use watch_status::{StatusCounts, WatchState, WatchStatus, WatchlistEntry};
