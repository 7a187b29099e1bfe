pub mod books;
pub mod borrowings;
pub mod checkout;
pub mod overdue;
pub mod payments;

#[cfg(test)]
pub(crate) mod fixtures;
