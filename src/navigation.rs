//! The page headers shown above the records page and the landing page.

use maud::{Markup, html};

use crate::{endpoints, html::BUTTON_SECONDARY_STYLE};

const HEADER_STYLE: &str = "flex items-center justify-between w-full px-6 py-4 \
    bg-white dark:bg-gray-800 border-b border-gray-200 dark:border-gray-700";

const BRAND_STYLE: &str = "text-2xl font-semibold text-gray-900 dark:text-white";

/// The header for a logged-in user: brand, greeting, and a log out button.
pub fn page_header(username: &str) -> Markup {
    html! {
        header class=(HEADER_STYLE)
        {
            a href=(endpoints::RECORDS_VIEW) class=(BRAND_STYLE) { "SpendWise" }

            div class="flex items-center gap-4"
            {
                span class="text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Welcome, " (username) "!"
                }

                a
                    id="log-out"
                    href=(endpoints::LOG_OUT)
                    class=(BUTTON_SECONDARY_STYLE)
                {
                    "Log out"
                }
            }
        }
    }
}

/// The header for visitors without a session: brand plus log in and register links.
pub fn landing_header() -> Markup {
    html! {
        header class=(HEADER_STYLE)
        {
            span class=(BRAND_STYLE) { "SpendWise" }

            div class="flex items-center gap-4"
            {
                a
                    href=(endpoints::LOG_IN_VIEW)
                    class=(BUTTON_SECONDARY_STYLE)
                {
                    "Log in"
                }

                a
                    href=(endpoints::REGISTER_VIEW)
                    class="py-2 px-4 text-sm font-medium text-white bg-blue-600 \
                        hover:bg-blue-700 dark:bg-blue-600 dark:hover:bg-blue-700 rounded"
                {
                    "Register"
                }
            }
        }
    }
}
