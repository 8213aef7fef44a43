use transport::CsvUpload;

/// Bundled demo transaction history: 44 transactions across July and
/// August 2025, covering the categories the question generator knows
/// how to ask about.
pub const SAMPLE_CSV: &str = "\
Date,Time,Transaction Details,Amount,Tags
15/08/2025,14:30:00,Paid to Dominos Pizza,-450.00,#🥘 Food
14/08/2025,09:15:20,Paid to Metro Cash & Carry,-1250.00,#🛒 Groceries
13/08/2025,19:45:10,Paid to BookMyShow,-300.00,#🎈 Entertainment
12/08/2025,11:20:30,Paid to Uber,-180.00,#🚗 Transport
11/08/2025,16:50:00,Paid to Starbucks Coffee,-220.00,#🥘 Food
10/08/2025,20:10:15,Paid to Big Bazaar,-850.00,#🛒 Groceries
09/08/2025,08:30:45,Paid to Indian Oil Petrol Pump,-2000.00,#⛽️ Fuel
08/08/2025,21:16:35,Paid to Cafe Coffee Day,-165.00,#🥘 Food
07/08/2025,15:23:54,Paid to Reliance Fresh,-322.00,#🛒 Groceries
06/08/2025,19:20:04,Paid to Swiggy,-340.00,#🥘 Food
05/08/2025,16:36:44,Money sent to John Smith,-5000.00,#💵 Transfers
04/08/2025,12:45:20,Paid to Apollo Pharmacy,-156.00,#🏥 Medical
03/08/2025,18:25:30,Paid to PVR Cinemas,-600.00,#🎈 Entertainment
02/08/2025,10:15:40,Paid to Spencer's Retail,-275.00,#🛒 Groceries
01/08/2025,22:30:15,Received from Salary Credit,75000.00,#💵 Income
31/07/2025,13:45:22,Paid to Zomato,-280.00,#🥘 Food
30/07/2025,17:20:18,Paid to Flipkart,-1200.00,#🛍️ Shopping
29/07/2025,11:35:45,Paid to Ola Cabs,-95.00,#🚗 Transport
28/07/2025,20:15:30,Paid to McDonald's,-320.00,#🥘 Food
27/07/2025,14:50:12,Paid to More Supermarket,-680.00,#🛒 Groceries
26/07/2025,16:25:40,Paid to Airtel Payments Bank,-399.00,#🧾 Bills
25/07/2025,09:18:55,Paid to BSNL Mobile,-249.00,#🧾 Bills
24/07/2025,19:42:33,Paid to Pizza Hut,-520.00,#🥘 Food
23/07/2025,12:30:15,Paid to Amazon,-890.00,#🛍️ Shopping
22/07/2025,15:55:28,Paid to HP Petrol Pump,-1800.00,#⛽️ Fuel
21/07/2025,18:40:50,Paid to KFC,-375.00,#🥘 Food
20/07/2025,10:22:35,Paid to D-Mart,-1050.00,#🛒 Groceries
19/07/2025,21:15:42,Received from Freelance Payment,12000.00,#💵 Income
18/07/2025,14:33:20,Paid to Myntra,-750.00,#🛍️ Shopping
17/07/2025,16:18:45,Paid to Burger King,-290.00,#🥘 Food
16/07/2025,11:45:30,Paid to Medplus Pharmacy,-225.00,#🏥 Medical
15/07/2025,20:35:18,Paid to Netflix,-649.00,#🎈 Entertainment
14/07/2025,13:28:42,Paid to BookMyShow,-450.00,#🎈 Entertainment
13/07/2025,17:52:15,Paid to Paytm Mall,-320.00,#🛍️ Shopping
12/07/2025,09:40:33,Paid to Uber Eats,-380.00,#🥘 Food
11/07/2025,15:25:50,Paid to Lifestyle Store,-1250.00,#🛍️ Shopping
10/07/2025,19:18:25,Paid to Subway,-180.00,#🥘 Food
09/07/2025,12:55:40,Paid to Shoppers Stop,-850.00,#🛍️ Shopping
08/07/2025,16:42:18,Paid to Haldiram's,-125.00,#🥘 Food
07/07/2025,20:30:55,Paid to Inox Cinemas,-500.00,#🎈 Entertainment
06/07/2025,11:15:32,Paid to Titan Showroom,-2500.00,#🛍️ Shopping
05/07/2025,18:48:20,Money sent to Sarah Johnson,-3000.00,#💵 Transfers
04/07/2025,14:22:45,Paid to Woodland,-1800.00,#🛍️ Shopping
03/07/2025,10:35:18,Paid to Cafe Mocha,-95.00,#🥘 Food
";

/// Filename the sample dataset is uploaded under.
pub const SAMPLE_FILENAME: &str = "sample_transactions.csv";

/// The bundled dataset, ready for the upload endpoint.
#[must_use]
pub fn sample_upload() -> CsvUpload {
    CsvUpload::new(SAMPLE_FILENAME, SAMPLE_CSV.as_bytes().to_vec())
}
