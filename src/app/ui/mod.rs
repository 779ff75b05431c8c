mod details;
mod onboarding;
mod panels;
mod quiz;
