//! Deals module - revenue-based funding offers and investor commitments.

mod deals_model;
mod deals_service;
mod deals_traits;

#[cfg(test)]
mod deals_service_tests;

pub use deals_model::{
    Deal, DealStatus, FundingClose, Investment, InvestmentOutcome, InvestmentRequest, NewDeal,
};
pub use deals_service::DealService;
pub use deals_traits::{DealRepositoryTrait, DealServiceTrait};
