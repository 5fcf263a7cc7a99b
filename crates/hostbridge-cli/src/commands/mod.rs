pub mod demo;
pub mod exports;
pub mod length;
pub mod palindrome;
pub mod runtimes;
