pub mod books;
pub mod borrowings;
pub mod payments;
